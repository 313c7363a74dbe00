pub mod books;
pub mod root;
pub mod stats;

use shelf_kernel::{Database, ModuleRegistry};

use books::repository::BookRepository;

/// Register all project-specific modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, db: &Database) {
    let repository = BookRepository::new(db.pool().clone());

    registry.register(root::create_module());
    registry.register(books::create_module(repository.clone()));
    registry.register(stats::create_module(repository));
}
