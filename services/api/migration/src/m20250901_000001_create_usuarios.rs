use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Usuarios::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Usuarios::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Usuarios::CodigoInstitucional)
                            .string_len(50)
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Usuarios::Email)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Usuarios::Nombres).string_len(100).not_null())
                    .col(ColumnDef::new(Usuarios::Apellidos).string_len(100).not_null())
                    .col(ColumnDef::new(Usuarios::PasswordHash).string_len(255))
                    .col(
                        ColumnDef::new(Usuarios::Activo)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Usuarios::FechaCreacion)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Usuarios::FechaActualizacion)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UsuarioRoles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UsuarioRoles::UsuarioId).uuid().not_null())
                    .col(
                        ColumnDef::new(UsuarioRoles::Rol)
                            .string_len(20)
                            .not_null()
                            .check(Expr::col(UsuarioRoles::Rol).is_in([
                                "estudiante",
                                "docente",
                                "administrador",
                            ])),
                    )
                    .primary_key(
                        Index::create()
                            .col(UsuarioRoles::UsuarioId)
                            .col(UsuarioRoles::Rol),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(UsuarioRoles::Table, UsuarioRoles::UsuarioId)
                            .to(Usuarios::Table, Usuarios::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UsuarioRoles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Usuarios::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Usuarios {
    Table,
    Id,
    CodigoInstitucional,
    Email,
    Nombres,
    Apellidos,
    PasswordHash,
    Activo,
    FechaCreacion,
    FechaActualizacion,
}

#[derive(Iden)]
enum UsuarioRoles {
    Table,
    UsuarioId,
    Rol,
}
