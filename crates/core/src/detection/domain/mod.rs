pub mod detection_result;
pub mod detection_service;
pub mod emotion;
