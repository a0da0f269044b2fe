/// Every completed resource fetch the page has recorded, with its initiator
/// classification. The watcher narrows this to asynchronous requests.
pub const COLLECT_RESOURCES: &str = r#"
() => performance.getEntriesByType('resource').map(r => ({
    name: r.name,
    initiatorType: r.initiatorType
}))
"#;
