use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(HorariosExamenes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(HorariosExamenes::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(HorariosExamenes::FechaExamen).date().not_null())
                    .col(ColumnDef::new(HorariosExamenes::HoraInicio).time().not_null())
                    .col(ColumnDef::new(HorariosExamenes::HoraFin).time().not_null())
                    .col(
                        ColumnDef::new(HorariosExamenes::CuposDisponibles)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(HorariosExamenes::CuposOcupados)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(HorariosExamenes::Activo)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(HorariosExamenes::CreadoPor).uuid())
                    .col(
                        ColumnDef::new(HorariosExamenes::FechaCreacion)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(HorariosExamenes::FechaActualizacion)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .check(
                        Expr::col(HorariosExamenes::CuposOcupados)
                            .gte(0)
                            .and(
                                Expr::col(HorariosExamenes::CuposOcupados)
                                    .lte(Expr::col(HorariosExamenes::CuposDisponibles)),
                            ),
                    )
                    .check(
                        Expr::col(HorariosExamenes::HoraInicio)
                            .lt(Expr::col(HorariosExamenes::HoraFin)),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(HorariosExamenes::Table, HorariosExamenes::CreadoPor)
                            .to(Usuarios::Table, Usuarios::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AgendamientosExamen::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AgendamientosExamen::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AgendamientosExamen::HorarioExamenId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AgendamientosExamen::EstudianteId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AgendamientosExamen::Estado)
                            .string_len(20)
                            .not_null()
                            .default("agendado")
                            .check(Expr::col(AgendamientosExamen::Estado).is_in([
                                "agendado",
                                "confirmado",
                                "cancelado",
                                "completado",
                            ])),
                    )
                    .col(
                        ColumnDef::new(AgendamientosExamen::FechaAgendamiento)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(
                                AgendamientosExamen::Table,
                                AgendamientosExamen::HorarioExamenId,
                            )
                            .to(HorariosExamenes::Table, HorariosExamenes::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(AgendamientosExamen::Table, AgendamientosExamen::EstudianteId)
                            .to(Estudiantes::Table, Estudiantes::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(AgendamientosExamen::Table)
                    .col(AgendamientosExamen::HorarioExamenId)
                    .col(AgendamientosExamen::EstudianteId)
                    .unique()
                    .name("uq_agendamientos_horario_estudiante")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AgendamientosExamen::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(HorariosExamenes::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum HorariosExamenes {
    Table,
    Id,
    FechaExamen,
    HoraInicio,
    HoraFin,
    CuposDisponibles,
    CuposOcupados,
    Activo,
    CreadoPor,
    FechaCreacion,
    FechaActualizacion,
}

#[derive(Iden)]
enum AgendamientosExamen {
    Table,
    Id,
    HorarioExamenId,
    EstudianteId,
    Estado,
    FechaAgendamiento,
}

#[derive(Iden)]
enum Estudiantes {
    Table,
    Id,
}

#[derive(Iden)]
enum Usuarios {
    Table,
    Id,
}
