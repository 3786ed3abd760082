use sea_orm::entity::prelude::*;

/// Student linkage. Exam bookings reference this id, not the user id.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "estudiantes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub usuario_id: Uuid,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::usuarios::Entity",
        from = "Column::UsuarioId",
        to = "super::usuarios::Column::Id"
    )]
    Usuario,
    #[sea_orm(has_many = "super::agendamientos_examen::Entity")]
    AgendamientosExamen,
}

impl Related<super::usuarios::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Usuario.def()
    }
}

impl Related<super::agendamientos_examen::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AgendamientosExamen.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
