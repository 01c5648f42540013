pub mod upscale_task;
