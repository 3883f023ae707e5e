use crate::db::Db;
use crate::error::AppError;
use crate::models::game_data::*;
use rusqlite::{params, OptionalExtension};
use serde_json::Value;

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

pub fn get_progress(db: &Db, owner_id: i64) -> Result<ProgressDocument, AppError> {
    let raw: Option<String> = db.with_conn(|conn| {
        conn.query_row(
            "SELECT progress_json FROM user_progress WHERE user_id = ?1",
            params![owner_id],
            |row| row.get(0),
        )
        .optional()
    })?;
    let progress = match raw {
        Some(json) => serde_json::from_str(&json)?,
        None => empty_object(),
    };
    Ok(ProgressDocument { progress })
}

/// Replaces the whole progress document.
pub fn save_progress(
    db: &Db,
    owner_id: i64,
    doc: ProgressDocument,
) -> Result<ProgressDocument, AppError> {
    let json = serde_json::to_string(&doc.progress)?;
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO user_progress (user_id, progress_json) VALUES (?1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET
                progress_json = excluded.progress_json,
                updated_at = datetime('now')",
            params![owner_id, json],
        )
    })?;
    tracing::info!(owner_id, "progress saved");
    Ok(doc)
}

pub fn get_modules(db: &Db, owner_id: i64) -> Result<ModulesDocument, AppError> {
    let raw: Option<(String, String)> = db.with_conn(|conn| {
        conn.query_row(
            "SELECT inventory_json, equipped_json FROM user_modules WHERE user_id = ?1",
            params![owner_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
    })?;
    match raw {
        Some((inventory, equipped)) => Ok(ModulesDocument {
            inventory: serde_json::from_str(&inventory)?,
            equipped: serde_json::from_str(&equipped)?,
        }),
        None => Ok(ModulesDocument {
            inventory: empty_object(),
            equipped: empty_object(),
        }),
    }
}

/// Replaces both module documents together.
pub fn save_modules(
    db: &Db,
    owner_id: i64,
    doc: ModulesDocument,
) -> Result<ModulesDocument, AppError> {
    let inventory = serde_json::to_string(&doc.inventory)?;
    let equipped = serde_json::to_string(&doc.equipped)?;
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO user_modules (user_id, inventory_json, equipped_json) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
                inventory_json = excluded.inventory_json,
                equipped_json = excluded.equipped_json,
                updated_at = datetime('now')",
            params![owner_id, inventory, equipped],
        )
    })?;
    tracing::info!(owner_id, "modules saved");
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_progress_defaults_and_upsert() {
        let db = Db::open_in_memory().unwrap();
        let owner = db.seed_user("progress");
        assert_eq!(get_progress(&db, owner).unwrap().progress, json!({}));

        save_progress(&db, owner, ProgressDocument { progress: json!({"cards": {"a": 1}}) })
            .unwrap();
        save_progress(&db, owner, ProgressDocument { progress: json!({"stones": 5}) }).unwrap();
        // Whole-document replace: the first save's keys are gone.
        assert_eq!(get_progress(&db, owner).unwrap().progress, json!({"stones": 5}));
    }

    #[test]
    fn test_modules_are_owner_scoped() {
        let db = Db::open_in_memory().unwrap();
        let alice = db.seed_user("alice");
        let bob = db.seed_user("bobby");
        save_modules(
            &db,
            alice,
            ModulesDocument {
                inventory: json!([{"id": "m1"}]),
                equipped: json!({"cannon": "m1"}),
            },
        )
        .unwrap();

        let mine = get_modules(&db, alice).unwrap();
        assert_eq!(mine.equipped, json!({"cannon": "m1"}));
        let theirs = get_modules(&db, bob).unwrap();
        assert_eq!(theirs.inventory, json!({}));
    }
}
