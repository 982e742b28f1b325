use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

pub async fn init_db(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;

    // Run migrations manually (simple SQL)
    run_migrations(&db).await?;

    Ok(db)
}

async fn execute(db: &DatabaseConnection, sql: &str) -> Result<(), DbErr> {
    db.execute(Statement::from_string(
        db.get_database_backend(),
        sql.to_owned(),
    ))
    .await?;
    Ok(())
}

async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    execute(db, "PRAGMA foreign_keys = ON").await?;

    // Accounts
    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            phone TEXT,
            user_type TEXT NOT NULL DEFAULT 'client',
            address TEXT,
            city TEXT,
            postal_code TEXT,
            latitude REAL,
            longitude REAL,
            is_verified BOOLEAN NOT NULL DEFAULT 0,
            is_active BOOLEAN NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS client_profiles (
            id TEXT PRIMARY KEY NOT NULL,
            user_id TEXT NOT NULL UNIQUE,
            preferred_radius_km INTEGER NOT NULL DEFAULT 20,
            total_reservations INTEGER NOT NULL DEFAULT 0,
            total_spent REAL NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS provider_profiles (
            id TEXT PRIMARY KEY NOT NULL,
            user_id TEXT NOT NULL UNIQUE,
            company_name TEXT,
            description TEXT,
            hourly_rate REAL,
            service_radius_km INTEGER NOT NULL DEFAULT 20,
            is_available BOOLEAN NOT NULL DEFAULT 1,
            is_verified BOOLEAN NOT NULL DEFAULT 0,
            total_jobs INTEGER NOT NULL DEFAULT 0,
            average_rating REAL NOT NULL DEFAULT 0,
            total_reviews INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        )
        "#,
    )
    .await?;

    // Catalog
    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS categories (
            id TEXT PRIMARY KEY NOT NULL,
            name TEXT NOT NULL UNIQUE,
            slug TEXT NOT NULL UNIQUE,
            description TEXT,
            parent_id TEXT,
            display_order INTEGER NOT NULL DEFAULT 0,
            is_active BOOLEAN NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            FOREIGN KEY(parent_id) REFERENCES categories(id) ON DELETE SET NULL
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS services (
            id TEXT PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            description TEXT,
            category_id TEXT NOT NULL,
            service_type TEXT,
            pricing_type TEXT NOT NULL DEFAULT 'fixed',
            base_price REAL NOT NULL DEFAULT 0,
            estimated_duration REAL,
            is_active BOOLEAN NOT NULL DEFAULT 1,
            popularity_score INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(category_id) REFERENCES categories(id) ON DELETE CASCADE
        )
        "#,
    )
    .await?;

    // Databases created before services were ranked; fails harmlessly once the column exists
    let _ = execute(
        db,
        "ALTER TABLE services ADD COLUMN popularity_score INTEGER NOT NULL DEFAULT 0",
    )
    .await;
    execute(
        db,
        "CREATE INDEX IF NOT EXISTS idx_services_popularity ON services(popularity_score DESC)",
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS provider_services (
            id TEXT PRIMARY KEY NOT NULL,
            provider_id TEXT NOT NULL,
            service_id TEXT NOT NULL,
            custom_price REAL,
            experience_years INTEGER NOT NULL DEFAULT 0,
            is_available BOOLEAN NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            UNIQUE(provider_id, service_id),
            FOREIGN KEY(provider_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY(service_id) REFERENCES services(id) ON DELETE CASCADE
        )
        "#,
    )
    .await?;

    // Reservations
    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS reservations (
            id TEXT PRIMARY KEY NOT NULL,
            client_id TEXT NOT NULL,
            provider_id TEXT NOT NULL,
            provider_service_id TEXT NOT NULL,
            scheduled_at TEXT NOT NULL,
            estimated_duration REAL NOT NULL DEFAULT 1,
            address TEXT NOT NULL,
            latitude REAL,
            longitude REAL,
            description TEXT NOT NULL,
            estimated_price REAL,
            final_price REAL,
            status TEXT NOT NULL DEFAULT 'pending',
            priority TEXT NOT NULL DEFAULT 'medium',
            confirmed_at TEXT,
            started_at TEXT,
            completed_at TEXT,
            cancelled_at TEXT,
            cancelled_by TEXT,
            cancellation_reason TEXT,
            internal_notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(client_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY(provider_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY(provider_service_id) REFERENCES provider_services(id) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_reservations_client_id ON reservations(client_id);
        CREATE INDEX IF NOT EXISTS idx_reservations_provider_id ON reservations(provider_id);
        CREATE INDEX IF NOT EXISTS idx_reservations_status ON reservations(status);
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS reservation_status_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            reservation_id TEXT NOT NULL,
            old_status TEXT,
            new_status TEXT NOT NULL,
            changed_by TEXT,
            reason TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY(reservation_id) REFERENCES reservations(id) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_status_history_reservation_id
            ON reservation_status_history(reservation_id);
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS reservation_photos (
            id TEXT PRIMARY KEY NOT NULL,
            reservation_id TEXT NOT NULL,
            image_path TEXT NOT NULL,
            photo_type TEXT NOT NULL DEFAULT 'other',
            description TEXT,
            uploaded_by TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(reservation_id) REFERENCES reservations(id) ON DELETE CASCADE
        )
        "#,
    )
    .await?;

    // Reviews
    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS reviews (
            id TEXT PRIMARY KEY NOT NULL,
            reservation_id TEXT NOT NULL,
            author_id TEXT NOT NULL,
            recipient_id TEXT NOT NULL,
            direction TEXT NOT NULL,
            rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
            comment TEXT NOT NULL DEFAULT '',
            is_visible BOOLEAN NOT NULL DEFAULT 1,
            is_moderated BOOLEAN NOT NULL DEFAULT 0,
            moderation_reason TEXT,
            response TEXT,
            response_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(reservation_id, author_id, direction),
            FOREIGN KEY(reservation_id) REFERENCES reservations(id) ON DELETE CASCADE,
            FOREIGN KEY(author_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY(recipient_id) REFERENCES users(id) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_reviews_recipient_id ON reviews(recipient_id);
        "#,
    )
    .await?;

    // Billing
    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS payments (
            id TEXT PRIMARY KEY NOT NULL,
            reservation_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            amount REAL NOT NULL CHECK (amount >= 0),
            status TEXT NOT NULL DEFAULT 'pending',
            method TEXT NOT NULL,
            transaction_id TEXT,
            paid_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(reservation_id) REFERENCES reservations(id) ON DELETE CASCADE,
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS invoices (
            id TEXT PRIMARY KEY NOT NULL,
            invoice_number TEXT NOT NULL UNIQUE,
            reservation_id TEXT NOT NULL UNIQUE,
            payment_id TEXT,
            issue_date TEXT NOT NULL,
            due_date TEXT NOT NULL,
            gross_amount REAL NOT NULL,
            net_amount REAL NOT NULL,
            tax_amount REAL NOT NULL,
            tax_rate REAL NOT NULL,
            status TEXT NOT NULL DEFAULT 'draft',
            description TEXT,
            paid_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(reservation_id) REFERENCES reservations(id) ON DELETE CASCADE,
            FOREIGN KEY(payment_id) REFERENCES payments(id) ON DELETE SET NULL
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS invoice_sequences (
            year INTEGER PRIMARY KEY NOT NULL,
            last_value INTEGER NOT NULL
        )
        "#,
    )
    .await?;

    // Messaging
    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS messages (
            id TEXT PRIMARY KEY NOT NULL,
            sender_id TEXT NOT NULL,
            recipient_id TEXT NOT NULL,
            reservation_id TEXT,
            conversation_id TEXT NOT NULL,
            content TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'sent',
            read_at TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY(sender_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY(recipient_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY(reservation_id) REFERENCES reservations(id) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_messages_conversation_id ON messages(conversation_id);
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS notifications (
            id TEXT PRIMARY KEY NOT NULL,
            user_id TEXT NOT NULL,
            notification_type TEXT NOT NULL,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            action_url TEXT,
            object_type TEXT,
            object_id TEXT,
            status TEXT NOT NULL DEFAULT 'unread',
            read_at TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        )
        "#,
    )
    .await?;

    // Audit trail
    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS history (
            id TEXT PRIMARY KEY NOT NULL,
            action TEXT NOT NULL DEFAULT 'other',
            user_id TEXT,
            object_type TEXT,
            object_id TEXT,
            description TEXT NOT NULL,
            context TEXT,
            importance TEXT NOT NULL DEFAULT 'info',
            ip_address TEXT,
            user_agent TEXT,
            data_before TEXT,
            data_after TEXT,
            tags TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE SET NULL
        );
        CREATE INDEX IF NOT EXISTS idx_history_action ON history(action);
        CREATE INDEX IF NOT EXISTS idx_history_object ON history(object_type, object_id);
        "#,
    )
    .await?;

    Ok(())
}
