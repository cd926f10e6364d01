pub mod design_repo;
pub mod generation_repo;

pub use design_repo::DesignRepo;
pub use generation_repo::GenerationRepo;
