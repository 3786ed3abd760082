use sea_orm::entity::prelude::*;

/// A student's booking on an exam schedule. Unique per
/// (horario_examen_id, estudiante_id).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "agendamientos_examen")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub horario_examen_id: Uuid,
    pub estudiante_id: Uuid,
    pub estado: String,
    pub fecha_agendamiento: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::horarios_examenes::Entity",
        from = "Column::HorarioExamenId",
        to = "super::horarios_examenes::Column::Id"
    )]
    HorarioExamen,
    #[sea_orm(
        belongs_to = "super::estudiantes::Entity",
        from = "Column::EstudianteId",
        to = "super::estudiantes::Column::Id"
    )]
    Estudiante,
}

impl Related<super::horarios_examenes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::HorarioExamen.def()
    }
}

impl Related<super::estudiantes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Estudiante.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
