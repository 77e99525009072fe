use std::path::{Path, PathBuf};

use sqlx::SqlitePool;

use crate::dto::admin_dto::{BackupResponse, WipeResponse};
use crate::error::{Error, Result};
use crate::utils::{crypto, time, token};

const IMAGE_PREFIX: &str = "images/";

/// Extensions accepted for question images, keyed by their leading magic bytes.
const IMAGE_SIGNATURES: [(&[u8], &str); 5] = [
    (b"\x89PNG\r\n\x1a\n", "png"),
    (b"\xFF\xD8\xFF", "jpg"),
    (b"GIF87a", "gif"),
    (b"GIF89a", "gif"),
    (b"BM", "bmp"),
];

#[derive(Clone)]
pub struct AdminService {
    pool: SqlitePool,
    images_dir: PathBuf,
    backup_dir: PathBuf,
    wipe_password_hash: Option<String>,
}

impl AdminService {
    pub fn new(
        pool: SqlitePool,
        images_dir: PathBuf,
        backup_dir: PathBuf,
        wipe_password_hash: Option<String>,
    ) -> Self {
        Self {
            pool,
            images_dir,
            backup_dir,
            wipe_password_hash,
        }
    }

    /// Consistent copy of the live database, taken with `VACUUM INTO`.
    pub async fn backup(&self) -> Result<BackupResponse> {
        tokio::fs::create_dir_all(&self.backup_dir).await?;
        let file_name = format!("test_questions_backup_{}.db", time::file_stamp(&time::now()));
        let path = self.backup_dir.join(file_name);
        if tokio::fs::try_exists(&path).await? {
            return Err(Error::BadRequest(
                "A backup was taken less than a second ago; try again".to_string(),
            ));
        }

        sqlx::query("VACUUM INTO ?")
            .bind(path.to_string_lossy().into_owned())
            .execute(&self.pool)
            .await?;

        let bytes = tokio::fs::metadata(&path).await?.len();
        tracing::info!(path = %path.display(), bytes, "database backup written");
        Ok(BackupResponse {
            path: path.to_string_lossy().into_owned(),
            bytes,
        })
    }

    /// Deletes every question and weight after checking the wipe password.
    pub async fn wipe(&self, password: &str, confirm: bool) -> Result<WipeResponse> {
        if !confirm {
            return Err(Error::BadRequest(
                "Wiping the question bank must be confirmed".to_string(),
            ));
        }
        let hash = self.wipe_password_hash.as_deref().ok_or_else(|| {
            Error::Unauthorized("Wiping is disabled: no wipe password is configured".to_string())
        })?;
        if !crypto::verify_password(password, hash)? {
            tracing::warn!("wipe rejected: wrong password");
            return Err(Error::Unauthorized("Incorrect password".to_string()));
        }

        let mut tx = self.pool.begin().await?;
        let questions = sqlx::query("DELETE FROM questions")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let weights = sqlx::query("DELETE FROM category_settings")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM sqlite_sequence WHERE name = 'questions'")
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::warn!(questions, weights, "question bank wiped");
        Ok(WipeResponse {
            questions_deleted: questions,
            weights_deleted: weights,
        })
    }

    /// Rewrites bare image file names to `images/<file>` when the file is in the images dir.
    pub async fn normalize_image_paths(&self) -> Result<u64> {
        let rows: Vec<(i64, String)> = sqlx::query_as(
            "SELECT id, image_path FROM questions WHERE image_path IS NOT NULL AND image_path != ''",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut updated = 0;
        for (id, stored) in rows {
            let Some(normalized) = normalized_image_path(&stored, &self.images_dir) else {
                continue;
            };
            sqlx::query("UPDATE questions SET image_path = ? WHERE id = ?")
                .bind(&normalized)
                .bind(id)
                .execute(&self.pool)
                .await?;
            updated += 1;
        }
        if updated > 0 {
            tracing::info!(updated, "normalized stored image paths");
        }
        Ok(updated)
    }

    /// Stores an uploaded image under a generated name and returns its stored path.
    pub async fn save_image(&self, original_name: &str, data: &[u8]) -> Result<String> {
        let extension = detect_image_extension(data).ok_or_else(|| {
            Error::BadRequest(format!(
                "'{}' is not a supported image (png, jpg, gif or bmp)",
                original_name
            ))
        })?;

        tokio::fs::create_dir_all(&self.images_dir).await?;
        let file_name = token::image_file_name(extension);
        tokio::fs::write(self.images_dir.join(&file_name), data).await?;

        tracing::info!(file = %file_name, bytes = data.len(), "image stored");
        Ok(format!("{}{}", IMAGE_PREFIX, file_name))
    }
}

pub fn detect_image_extension(data: &[u8]) -> Option<&'static str> {
    IMAGE_SIGNATURES
        .iter()
        .find(|(magic, _)| data.starts_with(magic))
        .map(|(_, ext)| *ext)
}

fn normalized_image_path(stored: &str, images_dir: &Path) -> Option<String> {
    let unified = stored.replace('\\', "/");
    if unified.starts_with(IMAGE_PREFIX) || Path::new(&unified).is_absolute() {
        return (unified != stored).then_some(unified);
    }
    let file_name = Path::new(&unified).file_name()?.to_string_lossy().into_owned();
    images_dir
        .join(&file_name)
        .is_file()
        .then(|| format!("{}{}", IMAGE_PREFIX, file_name))
}
