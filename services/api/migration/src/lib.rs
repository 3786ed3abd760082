pub use sea_orm_migration::prelude::*;

mod m20250901_000001_create_usuarios;
mod m20250901_000002_create_estudiantes;
mod m20250901_000003_create_cursos;
mod m20250901_000004_create_horarios_examenes;
mod m20250901_000005_add_lookup_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250901_000001_create_usuarios::Migration),
            Box::new(m20250901_000002_create_estudiantes::Migration),
            Box::new(m20250901_000003_create_cursos::Migration),
            Box::new(m20250901_000004_create_horarios_examenes::Migration),
            Box::new(m20250901_000005_add_lookup_indexes::Migration),
        ]
    }
}
