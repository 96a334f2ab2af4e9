pub mod camera_source;
pub mod ffmpeg_camera;
