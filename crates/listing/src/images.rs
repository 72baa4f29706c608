/// Where the upload receiver serves photos from, as seen by the platform.
///
/// Image identifiers are turned into `http://<host>:<port>/uploads/<id>`
/// before they go into a listing; local paths are never sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHost {
    pub host: String,
    pub port: u16,
}

impl ImageHost {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn url_for(&self, identifier: &str) -> String {
        format!("{}/uploads/{}", self.base_url(), urlencoding::encode(identifier))
    }

    /// URLs for `identifiers`, in order, skipping blanks.
    pub fn urls_for<S: AsRef<str>>(&self, identifiers: &[S]) -> Vec<String> {
        identifiers
            .iter()
            .map(|id| id.as_ref().trim())
            .filter(|id| !id.is_empty())
            .map(|id| self.url_for(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_public_urls_in_order() {
        let host = ImageHost::new("192.168.1.20", 5000);
        assert_eq!(
            host.urls_for(&["20250101_120000_front.jpg", " ", "20250101_120001_back.jpg"]),
            vec![
                "http://192.168.1.20:5000/uploads/20250101_120000_front.jpg".to_string(),
                "http://192.168.1.20:5000/uploads/20250101_120001_back.jpg".to_string(),
            ]
        );
    }

    #[test]
    fn identifiers_are_percent_encoded() {
        let host = ImageHost::new("10.0.0.5", 8080);
        assert_eq!(
            host.url_for("card front.jpg"),
            "http://10.0.0.5:8080/uploads/card%20front.jpg"
        );
    }
}
