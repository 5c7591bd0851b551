mod account;
mod account_db;
mod link;
mod link_db;
mod memory;
mod profile;
mod profile_db;

pub use account_db::AccountRepository;
pub use link_db::LinkRepository;
pub use memory::MemoryRepository;
pub use profile_db::ProfileRepository;

pub use account::AccountRepo;
pub use link::LinkRepo;
pub use profile::ProfileRepo;
