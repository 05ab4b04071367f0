use url::Url;

/// Where the page was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    url: Url,
}

impl PageLocation {
    /// Accepts an absolute URL or a bare path with optional query
    /// (`/index.html?reveal=1`).
    pub fn parse(input: &str) -> Result<Self, url::ParseError> {
        let url = match Url::parse(input) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Url::parse("http://localhost/")?.join(input)?
            }
            Err(e) => return Err(e),
        };
        Ok(Self { url })
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// First value of a query parameter.
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    /// The site root or its index document.
    pub fn is_entry_page(&self) -> bool {
        let path = self.path();
        path == "/" || path.ends_with("/index.html")
    }

    /// A path naming the index document (`index` or `index.html`, any case).
    /// The bare root does not count.
    pub fn is_index_document(&self) -> bool {
        let path = self.path().to_ascii_lowercase();
        path.ends_with("index") || path.ends_with("index.html")
    }
}

impl std::fmt::Display for PageLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url)
    }
}
