use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ========== SENSORS ==========
        manager
            .create_table(
                Table::create()
                    .table(Sensors::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Sensors::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .extra("DEFAULT gen_random_uuid()"),
                    )
                    .col(ColumnDef::new(Sensors::SensorName).string_len(100).not_null())
                    .col(ColumnDef::new(Sensors::SensorType).string_len(32).not_null())
                    .col(ColumnDef::new(Sensors::Location).string_len(128))
                    .col(ColumnDef::new(Sensors::Unit).string_len(16))
                    .col(ColumnDef::new(Sensors::IsActive).boolean().default(true))
                    .col(
                        ColumnDef::new(Sensors::CreatedAt)
                            .timestamp_with_time_zone()
                            .extra("DEFAULT NOW()"),
                    )
                    .to_owned(),
            )
            .await?;

        let db = manager.get_connection();
        db.execute_unprepared(
            "ALTER TABLE sensors ADD CONSTRAINT sensors_type_check \
             CHECK (sensor_type IN ('temperature', 'humidity', 'soil_moisture'))",
        )
        .await?;

        // ========== SENSOR READINGS ==========
        // Rows are immutable once written by the ingestion path.
        manager
            .create_table(
                Table::create()
                    .table(SensorReadings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SensorReadings::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .extra("DEFAULT gen_random_uuid()"),
                    )
                    .col(ColumnDef::new(SensorReadings::SensorId).uuid().not_null())
                    .col(ColumnDef::new(SensorReadings::Value).double().not_null())
                    .col(ColumnDef::new(SensorReadings::Unit).string_len(16))
                    .col(
                        ColumnDef::new(SensorReadings::RecordedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sensor_readings_sensor")
                            .from(SensorReadings::Table, SensorReadings::SensorId)
                            .to(Sensors::Table, Sensors::Id),
                    )
                    .to_owned(),
            )
            .await?;

        db.execute_unprepared(
            "CREATE INDEX idx_sensor_readings_sensor_time ON sensor_readings (sensor_id, recorded_at DESC)",
        )
        .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sensor_readings_recorded_at")
                    .table(SensorReadings::Table)
                    .col(SensorReadings::RecordedAt)
                    .to_owned(),
            )
            .await?;

        // ========== PEST ALERTS ==========
        // Written by the detection service; only status/is_read change afterwards.
        manager
            .create_table(
                Table::create()
                    .table(PestAlerts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PestAlerts::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .extra("DEFAULT gen_random_uuid()"),
                    )
                    .col(ColumnDef::new(PestAlerts::PestType).string_len(64).not_null())
                    .col(ColumnDef::new(PestAlerts::Location).string_len(128))
                    .col(ColumnDef::new(PestAlerts::Severity).string_len(16).not_null())
                    .col(
                        ColumnDef::new(PestAlerts::Status)
                            .string_len(16)
                            .not_null()
                            .default("new"),
                    )
                    .col(ColumnDef::new(PestAlerts::ConfidenceScore).double())
                    .col(ColumnDef::new(PestAlerts::Description).text())
                    .col(ColumnDef::new(PestAlerts::SuggestedActions).text())
                    .col(ColumnDef::new(PestAlerts::ImagePath).string_len(255))
                    .col(ColumnDef::new(PestAlerts::IsRead).boolean().default(false))
                    .col(
                        ColumnDef::new(PestAlerts::DetectedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        db.execute_unprepared(
            "ALTER TABLE pest_alerts ADD CONSTRAINT pest_alerts_severity_check \
             CHECK (severity IN ('low', 'medium', 'high', 'critical'))",
        )
        .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_pest_alerts_detected_at")
                    .table(PestAlerts::Table)
                    .col(PestAlerts::DetectedAt)
                    .to_owned(),
            )
            .await?;

        // ========== USER SETTINGS (key/value) ==========
        manager
            .create_table(
                Table::create()
                    .table(UserSettings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserSettings::SettingKey)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UserSettings::SettingValue).text().not_null())
                    .col(
                        ColumnDef::new(UserSettings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .extra("DEFAULT NOW()"),
                    )
                    .to_owned(),
            )
            .await?;

        // Seed defaults so the settings page shows real rows on first start
        db.execute_unprepared(
            "INSERT INTO user_settings (setting_key, setting_value) VALUES \
             ('sensor_logging_interval', '30'), \
             ('threshold_temperature_min', '20'), ('threshold_temperature_max', '28'), \
             ('threshold_humidity_min', '60'), ('threshold_humidity_max', '80'), \
             ('threshold_soil_moisture_min', '40'), ('threshold_soil_moisture_max', '60') \
             ON CONFLICT (setting_key) DO NOTHING",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserSettings::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PestAlerts::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(SensorReadings::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Sensors::Table).if_exists().to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Sensors {
    Table,
    Id,
    SensorName,
    SensorType,
    Location,
    Unit,
    IsActive,
    CreatedAt,
}

#[derive(DeriveIden)]
enum SensorReadings {
    Table,
    Id,
    SensorId,
    Value,
    Unit,
    RecordedAt,
}

#[derive(DeriveIden)]
enum PestAlerts {
    Table,
    Id,
    PestType,
    Location,
    Severity,
    Status,
    ConfidenceScore,
    Description,
    SuggestedActions,
    ImagePath,
    IsRead,
    DetectedAt,
}

#[derive(DeriveIden)]
enum UserSettings {
    Table,
    SettingKey,
    SettingValue,
    UpdatedAt,
}
