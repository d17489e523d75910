use std::path::{Path, PathBuf};

use axum::extract::Multipart;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::contact_book::ContactBookEntry;

const ENTRY_COLS: &str =
    "id, student_id, date, mood, focus, appetite, homework, note, photo_urls,
     is_absent, signed_at, signed_by, created_by, created_at, updated_at";

pub struct PhotoService;

impl PhotoService {
    /// Store every image of a multipart upload under
    /// `<media_dir>/contact-book/<date>/<student>/` and append the resulting
    /// URLs to the entry's photo list. The batch is all-or-nothing: any
    /// failure removes the files already staged and no URL is recorded.
    pub async fn upload_contact_book_photos(
        pool: &PgPool,
        media_dir: &str,
        student_id: Uuid,
        date: NaiveDate,
        created_by: Uuid,
        mut multipart: Multipart,
    ) -> anyhow::Result<ContactBookEntry> {
        let target_dir = PathBuf::from(media_dir)
            .join("contact-book")
            .join(date.to_string())
            .join(student_id.to_string());
        tokio::fs::create_dir_all(&target_dir).await?;

        let mut staged: Vec<(PathBuf, String)> = Vec::new();
        let mut batch_err: Option<anyhow::Error> = None;

        loop {
            let field = match multipart.next_field().await {
                Ok(Some(f)) => f,
                Ok(None) => break,
                Err(e) => {
                    batch_err = Some(e.into());
                    break;
                }
            };
            if field.name() != Some("file") {
                continue;
            }

            let filename = field.file_name().unwrap_or("upload").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            if !content_type.starts_with("image/") {
                batch_err = Some(anyhow::anyhow!("'{filename}' is not an image"));
                break;
            }

            let bytes = match field.bytes().await {
                Ok(b) => b,
                Err(e) => {
                    batch_err = Some(e.into());
                    break;
                }
            };

            let ext = Path::new(&filename)
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("bin");
            let storage_name = format!("{}-{}.{}", chrono::Utc::now().timestamp_millis(), Uuid::new_v4(), ext);
            let full_path = target_dir.join(&storage_name);
            let url = format!("/photos/contact-book/{date}/{student_id}/{storage_name}");

            if let Err(e) = tokio::fs::write(&full_path, &bytes).await {
                batch_err = Some(e.into());
                break;
            }
            staged.push((full_path, url));
        }

        if let Some(e) = batch_err {
            // Abort the whole batch: unlink staged files, surface the error.
            for (path, _) in &staged {
                let _ = tokio::fs::remove_file(path).await;
            }
            return Err(e);
        }

        anyhow::ensure!(!staged.is_empty(), "No file field in upload");
        let urls: Vec<String> = staged.into_iter().map(|(_, url)| url).collect();

        let entry = sqlx::query_as::<_, ContactBookEntry>(&format!(
            "INSERT INTO contact_book_entries (student_id, date, photo_urls, created_by)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (student_id, date) DO UPDATE SET
                 photo_urls = contact_book_entries.photo_urls || EXCLUDED.photo_urls,
                 updated_at = NOW()
             RETURNING {ENTRY_COLS}"
        ))
        .bind(student_id)
        .bind(date)
        .bind(&urls)
        .bind(created_by)
        .fetch_one(pool)
        .await?;

        Ok(entry)
    }
}
