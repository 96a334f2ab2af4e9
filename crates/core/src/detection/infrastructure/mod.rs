pub mod http_detection_client;
pub mod response_parser;
