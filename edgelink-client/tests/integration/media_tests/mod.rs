mod test_media_before_connected;
mod test_media_failure;
mod test_negotiation_timeout;
