use sea_orm::entity::prelude::*;

/// Enrollment of a student user in a course. Unique per (curso_id, usuario_id).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "curso_estudiantes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub curso_id: Uuid,
    pub usuario_id: Uuid,
    pub estado: String,
    pub nota_final: Option<f64>,
    pub fecha_inscripcion: chrono::DateTime<chrono::Utc>,
    pub fecha_estado: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::cursos::Entity",
        from = "Column::CursoId",
        to = "super::cursos::Column::Id"
    )]
    Curso,
    #[sea_orm(
        belongs_to = "super::usuarios::Entity",
        from = "Column::UsuarioId",
        to = "super::usuarios::Column::Id"
    )]
    Usuario,
}

impl Related<super::cursos::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Curso.def()
    }
}

impl Related<super::usuarios::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Usuario.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
