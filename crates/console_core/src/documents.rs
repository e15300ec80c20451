use serde::{Deserialize, Serialize};

use crate::filters::FilterState;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DocumentSummary {
    pub id: String,
    #[serde(rename = "tipo")]
    pub kind: String,
    #[serde(rename = "serie")]
    pub series: String,
    #[serde(rename = "numero")]
    pub number: String,
    #[serde(rename = "fecha_emision")]
    pub issued_on: String,
    #[serde(rename = "ruc_emisor")]
    pub issuer_ruc: String,
    #[serde(rename = "razon_emisor", default)]
    pub issuer_name: Option<String>,
    #[serde(rename = "ruc_receptor", default)]
    pub receiver_ruc: Option<String>,
    #[serde(rename = "razon_receptor", default)]
    pub receiver_name: Option<String>,
    #[serde(rename = "moneda", default)]
    pub currency: String,
    #[serde(default)]
    pub total: Option<f64>,
    #[serde(rename = "modulo", default)]
    pub module: String,
    #[serde(default)]
    pub has_xml: bool,
    #[serde(default)]
    pub has_pdf: bool,
}

impl DocumentSummary {
    /// Counterparty shown in listings: the receiver when known, else the issuer.
    pub fn counterparty(&self) -> (&str, Option<&str>) {
        match &self.receiver_ruc {
            Some(ruc) => (
                ruc.as_str(),
                self.receiver_name.as_deref().or(self.issuer_name.as_deref()),
            ),
            None => (self.issuer_ruc.as_str(), self.issuer_name.as_deref()),
        }
    }
}

/// Wire shape of the listing endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PageResponse {
    pub items: Vec<DocumentSummary>,
    pub total: u64,
    #[serde(default)]
    pub skip: u64,
    #[serde(default)]
    pub limit: u64,
}

/// A fetched snapshot together with the filters that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultPage {
    pub items: Vec<DocumentSummary>,
    pub total: u64,
    pub filters: FilterState,
}

impl ResultPage {
    pub fn empty(filters: FilterState) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            filters,
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.id.as_str())
    }

    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.filters.page, self.filters.page_size, self.total)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pagination {
    pub page: u32,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
    /// 1-based index of the first shown row; 0 when nothing is shown.
    pub first_row: u64,
    pub last_row: u64,
}

impl Pagination {
    pub fn new(page: u32, page_size: u32, total: u64) -> Self {
        let size = u64::from(page_size.max(1));
        let total_pages = total.div_ceil(size);
        let skip = u64::from(page.saturating_sub(1)) * size;
        let last_row = (skip + size).min(total);
        Self {
            page,
            total_pages,
            has_next: u64::from(page) < total_pages,
            has_prev: page > 1,
            first_row: if last_row > skip { skip + 1 } else { 0 },
            last_row,
        }
    }
}

/// Format tag for batch downloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchFormat {
    Xml,
    Pdf,
    All,
}

impl BatchFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            BatchFormat::Xml => "xml",
            BatchFormat::Pdf => "pdf",
            BatchFormat::All => "all",
        }
    }
}

/// A single stored file of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFile {
    Xml,
    Pdf,
}

impl DocumentFile {
    pub fn extension(self) -> &'static str {
        match self {
            DocumentFile::Xml => "xml",
            DocumentFile::Pdf => "pdf",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Pagination;

    #[test]
    fn pagination_bounds() {
        let p = Pagination::new(1, 50, 120);
        assert_eq!((p.total_pages, p.has_next, p.has_prev), (3, true, false));
        assert_eq!((p.first_row, p.last_row), (1, 50));

        let p = Pagination::new(3, 50, 120);
        assert_eq!((p.has_next, p.has_prev), (false, true));
        assert_eq!((p.first_row, p.last_row), (101, 120));

        let p = Pagination::new(1, 50, 0);
        assert_eq!((p.total_pages, p.first_row, p.last_row), (0, 0, 0));
    }
}
