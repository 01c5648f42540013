mod upscale_task_repo;

pub use upscale_task_repo::UpscaleTaskRepo;
