//! Tool catalog
//!
//! The MCP tools grouped by the subsystem that serves them:
//! - Directory: contact lookup and store health
//! - Extraction: email-field extraction
//! - Documents: indexing and search

/// Directory tools category
pub struct DirectoryTools;

/// Extraction tools category
pub struct ExtractionTools;

/// Document index tools category
pub struct DocumentTools;

/// Tool category trait
pub trait ToolCategory {
    /// Category name
    fn category_name() -> &'static str
    where
        Self: Sized;
    /// List of tool names in this category
    fn tool_names() -> &'static [&'static str]
    where
        Self: Sized;
}

impl ToolCategory for DirectoryTools {
    fn category_name() -> &'static str {
        "directory"
    }
    fn tool_names() -> &'static [&'static str] {
        &["lookup_contact", "check_connection"]
    }
}

impl ToolCategory for ExtractionTools {
    fn category_name() -> &'static str {
        "extraction"
    }
    fn tool_names() -> &'static [&'static str] {
        &["extract_email_fields"]
    }
}

impl ToolCategory for DocumentTools {
    fn category_name() -> &'static str {
        "documents"
    }
    fn tool_names() -> &'static [&'static str] {
        &["index_document", "search_documents"]
    }
}

/// All tool names
pub const ALL_TOOL_NAMES: &[&str] = &[
    "lookup_contact",
    "check_connection",
    "extract_email_fields",
    "index_document",
    "search_documents",
];

/// Total number of tools
pub const TOTAL_TOOLS: usize = ALL_TOOL_NAMES.len();

/// One `category: tool, tool` line per category, for server instructions.
pub fn catalog_lines() -> Vec<String> {
    [
        (DirectoryTools::category_name(), DirectoryTools::tool_names()),
        (ExtractionTools::category_name(), ExtractionTools::tool_names()),
        (DocumentTools::category_name(), DocumentTools::tool_names()),
    ]
    .iter()
    .map(|(category, tools)| format!("{category}: {}", tools.join(", ")))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_cover_every_tool_once() {
        let mut grouped = [
            DirectoryTools::tool_names(),
            ExtractionTools::tool_names(),
            DocumentTools::tool_names(),
        ]
        .concat();
        grouped.sort_unstable();

        let mut all = ALL_TOOL_NAMES.to_vec();
        all.sort_unstable();

        assert_eq!(grouped, all);
        assert_eq!(TOTAL_TOOLS, 5);
        assert_eq!(DocumentTools::category_name(), "documents");
    }

    #[test]
    fn catalog_lines_group_tools_by_category() {
        assert_eq!(
            catalog_lines(),
            vec![
                "directory: lookup_contact, check_connection",
                "extraction: extract_email_fields",
                "documents: index_document, search_documents",
            ]
        );
    }
}
