pub mod analyze_image_use_case;
pub mod camera_session;
pub mod fps_counter;
pub mod pipeline_logger;
pub mod realtime_loop;
pub mod upload_guard;
