/// Build the `ServerInfo.instructions` string shown to MCP clients.
pub fn build_instructions(document_count: usize) -> String {
    format!(
        "Document server holding {document_count} in-memory documents. Use read_doc/edit_doc to work with them, read docs://documents for the id list, and the format/summarize prompts to rewrite a document."
    )
}
