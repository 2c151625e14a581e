use sea_orm_migration::{prelude::*, sea_orm::DatabaseBackend};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(Devices::Table)
                    .col(pk_id_col(manager, Devices::Id))
                    .col(ColumnDef::new(Devices::DeviceId).string().not_null())
                    .col(ColumnDef::new(Devices::TaskName).string().not_null())
                    .col(timestamp_col(Devices::CreatedAt))
                    .col(timestamp_col(Devices::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        // Second line of defence for concurrent registrations that both pass
        // the existence pre-check.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_devices_device_id")
                    .table(Devices::Table)
                    .col(Devices::DeviceId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_devices_created_at")
                    .table(Devices::Table)
                    .col(Devices::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(TaskStatusLogs::Table)
                    .col(pk_id_col(manager, TaskStatusLogs::Id))
                    .col(uuid_col(TaskStatusLogs::Uuid))
                    .col(fk_id_col(manager, TaskStatusLogs::DeviceId))
                    .col(
                        ColumnDef::new(TaskStatusLogs::Status)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TaskStatusLogs::Timestamp)
                            .timestamp()
                            .not_null(),
                    )
                    .col(timestamp_col(TaskStatusLogs::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_task_status_logs_device_id")
                            .from(TaskStatusLogs::Table, TaskStatusLogs::DeviceId)
                            .to(Devices::Table, Devices::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_task_status_logs_uuid")
                    .table(TaskStatusLogs::Table)
                    .col(TaskStatusLogs::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_task_status_logs_device_id_timestamp")
                    .table(TaskStatusLogs::Table)
                    .col(TaskStatusLogs::DeviceId)
                    .col(TaskStatusLogs::Timestamp)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TaskStatusLogs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Devices::Table).to_owned())
            .await?;
        Ok(())
    }
}

fn pk_id_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.not_null().auto_increment().primary_key().to_owned()
}

fn fk_id_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.not_null().to_owned()
}

fn uuid_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col).uuid().not_null().to_owned()
}

fn timestamp_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}

#[derive(Iden)]
enum Devices {
    Table,
    Id,
    DeviceId,
    TaskName,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum TaskStatusLogs {
    Table,
    Id,
    Uuid,
    DeviceId,
    Status,
    Timestamp,
    CreatedAt,
}
