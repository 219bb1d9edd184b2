mod test_connect_failure;
mod test_connection_lifecycle;
mod test_transport_lost;
