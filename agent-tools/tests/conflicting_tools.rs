use agent_tools::{ToolDiscovery, ToolError, ToolHost, TypeIndex, tools};
use futures::stream::{self, BoxStream, StreamExt};

struct GoogleSearch;

#[tools]
impl GoogleSearch {
    #[tool(description = "Searches with Google")]
    fn search(&self, query: String) -> String {
        format!("google: {query}")
    }
}

struct BingSearch;

#[tools]
impl BingSearch {
    #[tool(description = "Searches with Bing")]
    fn search(&self, query: String) -> String {
        format!("bing: {query}")
    }

    #[tool]
    fn ticker(&self) -> BoxStream<'static, u64> {
        stream::iter(0..3).boxed()
    }

    #[tool(virtual_thread)]
    async fn quote(&self, symbol: String) -> String {
        symbol
    }
}

#[test]
fn duplicate_names_block_publication() {
    let report = ToolDiscovery::new(TypeIndex::new()).discover_declared();
    assert!(report.has_fatal_errors());

    let duplicates: Vec<_> = report
        .errors()
        .iter()
        .filter_map(|err| match err {
            ToolError::DuplicateToolName {
                name,
                owner,
                existing_owner,
            } => Some((name.as_str(), owner.clone(), existing_owner.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(duplicates.len(), 1);

    let (name, owner, existing_owner) = &duplicates[0];
    assert_eq!(*name, "search");
    // Link order decides which declaration is seen first; one owner keeps it.
    let google = GoogleSearch::type_info().name().clone();
    let bing = BingSearch::type_info().name().clone();
    assert!(
        (owner == &bing && existing_owner == &google)
            || (owner == &google && existing_owner == &bing)
    );

    assert!(report.errors().iter().any(|err| matches!(
        err,
        ToolError::UnsupportedReturnType { method } if method.ends_with(".ticker")
    )));
    assert!(report.errors().iter().any(|err| matches!(
        err,
        ToolError::IncompatibleExecutionModel { method } if method.ends_with(".quote")
    )));

    let err = report.publish().unwrap_err();
    assert_eq!(err.errors.len(), 1);
    assert!(err.to_string().contains("`search`"));
}
