use crate::error::CatalogResult;
use crate::store::ObjectStore;

use super::model::MediaFile;

/// Object key for an uploaded file: `media/<uuid>/<sanitised name>`.
pub fn media_key(file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let safe = if safe.is_empty() { "file".to_string() } else { safe };
    format!("media/{}/{}", uuid::Uuid::new_v4(), safe)
}

/// Upload files in order and return their URLs in the same order.
///
/// On failure the files already stored are removed again.
pub async fn store_media(objects: &dyn ObjectStore, files: &[MediaFile]) -> CatalogResult<Vec<String>> {
    let mut urls = Vec::with_capacity(files.len());
    for file in files {
        let stored = match file.bytes() {
            Ok(bytes) => {
                objects
                    .put(&media_key(&file.file_name), bytes, &file.content_type)
                    .await
            }
            Err(e) => Err(e),
        };
        match stored {
            Ok(url) => urls.push(url),
            Err(e) => {
                release_media(objects, &urls).await;
                return Err(e);
            }
        }
    }
    Ok(urls)
}

/// Best-effort removal; failures are logged and skipped.
pub async fn release_media(objects: &dyn ObjectStore, urls: &[String]) {
    for url in urls {
        if let Err(e) = objects.delete(url).await {
            tracing::warn!("Failed to release media {}: {}", url, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CatalogError;
    use crate::store::MemoryObjectStore;

    fn file(name: &str, data: &str) -> MediaFile {
        MediaFile {
            file_name: name.into(),
            content_type: "image/png".into(),
            data: data.into(),
        }
    }

    #[test]
    fn keys_are_sanitised_and_unique() {
        let a = media_key("my photo (1).png");
        let b = media_key("my photo (1).png");
        assert!(a.starts_with("media/"));
        assert!(a.ends_with("/my_photo__1_.png"));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn stores_in_order() {
        let objects = MemoryObjectStore::new("https://m.test");
        let urls = store_media(&objects, &[file("a.png", "AQI="), file("b.mp4", "AwQ=")])
            .await
            .unwrap();
        assert_eq!(urls.len(), 2);
        assert!(urls[0].ends_with("/a.png"));
        assert!(urls[1].ends_with("/b.mp4"));
        assert_eq!(objects.len(), 2);
    }

    #[tokio::test]
    async fn failed_upload_rolls_back_earlier_files() {
        let objects = MemoryObjectStore::new("https://m.test");
        let err = store_media(&objects, &[file("a.png", "AQI="), file("b.png", "!!")])
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
        assert!(objects.is_empty());
    }
}
