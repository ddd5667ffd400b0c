//! Multipart form reading with an upload cap.

use std::collections::HashMap;

use axum::extract::Multipart;
use bytes::{Bytes, BytesMut};

use crate::shared::error::{PlatformError, Result};

/// Text fields and file parts of a `multipart/form-data` body.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, Bytes>,
}

impl MultipartForm {
    /// Drain the body. Each file part is capped at `max_file_size` bytes;
    /// the first byte over the cap rejects the request.
    pub async fn read(mut multipart: Multipart, max_file_size: usize) -> Result<Self> {
        let mut form = MultipartForm::default();

        while let Some(mut field) = multipart
            .next_field()
            .await
            .map_err(|e| PlatformError::validation(format!("malformed multipart body: {}", e)))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if field.file_name().is_some() {
                let mut buf = BytesMut::new();
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| PlatformError::validation(format!("malformed multipart body: {}", e)))?
                {
                    if buf.len() + chunk.len() > max_file_size {
                        return Err(PlatformError::PayloadTooLarge { limit: max_file_size });
                    }
                    buf.extend_from_slice(&chunk);
                }
                form.files.insert(name, buf.freeze());
            } else {
                let text = field
                    .text()
                    .await
                    .map_err(|e| PlatformError::validation(format!("malformed multipart field {}: {}", name, e)))?;
                form.fields.insert(name, text);
            }
        }

        Ok(form)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str).filter(|v| !v.trim().is_empty())
    }

    pub fn require_text(&self, name: &str) -> Result<&str> {
        self.text(name)
            .ok_or_else(|| PlatformError::validation(format!("field {} is required", name)))
    }

    /// Parse an optional numeric field; a present but unparsable value is
    /// a validation error.
    pub fn parse<T: std::str::FromStr>(&self, name: &str) -> Result<Option<T>> {
        self.text(name)
            .map(|v| {
                v.trim()
                    .parse::<T>()
                    .map_err(|_| PlatformError::validation(format!("field {} is not a number", name)))
            })
            .transpose()
    }

    /// Comma-separated list of ids, e.g. `"1,2, 3"`.
    pub fn id_list(&self, name: &str) -> Result<Vec<i64>> {
        let Some(raw) = self.text(name) else {
            return Ok(Vec::new());
        };
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<i64>()
                    .map_err(|_| PlatformError::validation(format!("field {} must list numeric ids", name)))
            })
            .collect()
    }

    pub fn take_file(&mut self, name: &str) -> Option<Bytes> {
        self.files.remove(name).filter(|data| !data.is_empty())
    }

    pub fn require_file(&mut self, name: &str) -> Result<Bytes> {
        self.take_file(name)
            .ok_or_else(|| PlatformError::validation(format!("file {} is required", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(fields: &[(&str, &str)]) -> MultipartForm {
        MultipartForm {
            fields: fields.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            files: HashMap::new(),
        }
    }

    #[test]
    fn test_id_list() {
        assert_eq!(form(&[("artists", "1, 2,3,")]).id_list("artists").unwrap(), vec![1, 2, 3]);
        assert!(form(&[]).id_list("artists").unwrap().is_empty());
        assert!(form(&[("artists", "1,x")]).id_list("artists").is_err());
    }

    #[test]
    fn test_blank_fields_are_absent() {
        let f = form(&[("name", "  "), ("duration", "215")]);
        assert!(f.text("name").is_none());
        assert!(f.require_text("name").is_err());
        assert_eq!(f.parse::<i32>("duration").unwrap(), Some(215));
        assert_eq!(f.parse::<i32>("albumId").unwrap(), None);
    }

    #[test]
    fn test_unparsable_number_is_rejected() {
        assert!(matches!(
            form(&[("duration", "long")]).parse::<i32>("duration"),
            Err(PlatformError::Validation { .. })
        ));
    }
}
