mod test_media_lost;
mod test_stream_rejected;
