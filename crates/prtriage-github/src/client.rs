use async_trait::async_trait;
use chrono::{DateTime, Utc};
use prtriage_core::{GithubConfig, LinkedIssue, PullRequest, TriageError};
use prtriage_engine::source::PullRequestSource;
use serde::{Deserialize, Serialize};

/// GitHub search never returns more results than this for one query.
const MAX_SEARCH_RESULTS: usize = 1000;

const SEARCH_QUERY: &str = "\
query($search: String!, $after: String) {
  search(query: $search, type: ISSUE, first: 100, after: $after) {
    issueCount
    pageInfo { hasNextPage endCursor }
    nodes {
      ... on PullRequest {
        number
        url
        title
        body
        createdAt
        author { login }
        milestone { title }
        repository { name isPrivate }
        latestReviews(first: 50) { nodes { state author { login } } }
      }
    }
  }
}";

const COUNT_QUERY: &str = "\
query($search: String!) {
  search(query: $search, type: ISSUE) { issueCount }
}";

/// GitHub client backing the triage engine's pull request searches.
///
/// Searches go through the GraphQL API; issues, branches and file contents
/// through REST. Every call is scoped to the configured organization.
pub struct GitHubClient {
    octocrab: octocrab::Octocrab,
    organization: String,
    core_repository: String,
}

impl GitHubClient {
    /// Create a client from an explicit token or the `GH_TOKEN` /
    /// `GITHUB_TOKEN` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::Config`] if no token is available, or
    /// [`TriageError::GitHub`] if the client cannot be built.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use prtriage_core::GithubConfig;
    /// use prtriage_github::GitHubClient;
    ///
    /// let client = GitHubClient::new(&GithubConfig::default(), Some("ghp_xxxx")).unwrap();
    /// ```
    pub fn new(config: &GithubConfig, token: Option<&str>) -> Result<Self, TriageError> {
        let token = match token.or(config.token.as_deref()) {
            Some(t) => t.to_string(),
            None => std::env::var("GH_TOKEN")
                .or_else(|_| std::env::var("GITHUB_TOKEN"))
                .map_err(|_| {
                    TriageError::Config(
                        "GH_TOKEN not set. Pass --github-token or set GH_TOKEN env var".into(),
                    )
                })?,
        };

        let octocrab = octocrab::Octocrab::builder()
            .personal_token(token)
            .build()
            .map_err(|e| TriageError::GitHub(format!("failed to create GitHub client: {e}")))?;

        Ok(Self {
            octocrab,
            organization: config.organization.clone(),
            core_repository: config.core_repository.clone(),
        })
    }

    async fn search_page(
        &self,
        query: &str,
        after: Option<&str>,
    ) -> Result<SearchConnection, TriageError> {
        let payload = serde_json::json!({
            "query": SEARCH_QUERY,
            "variables": { "search": query, "after": after },
        });
        let response: serde_json::Value = self
            .octocrab
            .graphql(&payload)
            .await
            .map_err(|e| TriageError::GitHub(format!("search failed: {e}")))?;
        Ok(parse_graphql::<SearchData>(response)?.search)
    }
}

#[async_trait]
impl PullRequestSource for GitHubClient {
    async fn search(&self, query: &str) -> Result<Vec<PullRequest>, TriageError> {
        let mut pull_requests = Vec::new();
        let mut after: Option<String> = None;
        let mut seen = 0;
        loop {
            let page = self.search_page(query, after.as_deref()).await?;
            seen += page.nodes.len();
            pull_requests.extend(page.nodes.into_iter().filter_map(SearchNode::into_pull_request));

            if !page.page_info.has_next_page || seen >= MAX_SEARCH_RESULTS {
                break;
            }
            after = page.page_info.end_cursor;
            if after.is_none() {
                break;
            }
        }
        tracing::debug!(%query, count = pull_requests.len(), "search");
        Ok(pull_requests)
    }

    async fn count(&self, query: &str) -> Result<u64, TriageError> {
        let payload = serde_json::json!({
            "query": COUNT_QUERY,
            "variables": { "search": query },
        });
        let response: serde_json::Value = self
            .octocrab
            .graphql(&payload)
            .await
            .map_err(|e| TriageError::GitHub(format!("count failed: {e}")))?;
        Ok(parse_graphql::<CountData>(response)?.search.issue_count)
    }

    async fn issue(&self, number: u64) -> Result<LinkedIssue, TriageError> {
        let route = format!(
            "/repos/{}/{}/issues/{number}",
            self.organization, self.core_repository
        );
        let issue: IssueResponse = self
            .octocrab
            .get(route, None::<&()>)
            .await
            .map_err(|e| TriageError::GitHub(format!("failed to fetch issue #{number}: {e}")))?;
        Ok(issue.into())
    }

    async fn branches(&self, repository: &str) -> Result<Vec<String>, TriageError> {
        let route = format!("/repos/{}/{repository}/branches", self.organization);
        let mut names = Vec::new();
        let mut page = 1;
        loop {
            let params = PageParams { per_page: 100, page };
            let branches: Vec<BranchResponse> = self
                .octocrab
                .get(&route, Some(&params))
                .await
                .map_err(|e| TriageError::GitHub(format!("failed to list branches: {e}")))?;
            let last = branches.len() < 100;
            names.extend(branches.into_iter().map(|b| b.name));
            if last {
                break;
            }
            page += 1;
        }
        Ok(names)
    }

    async fn file_content(
        &self,
        repository: &str,
        path: &str,
        reference: &str,
    ) -> Result<String, TriageError> {
        let mut contents = self
            .octocrab
            .repos(&self.organization, repository)
            .get_content()
            .path(path)
            .r#ref(reference)
            .send()
            .await
            .map_err(|e| TriageError::GitHub(format!("failed to fetch {path}: {e}")))?;
        contents
            .take_items()
            .into_iter()
            .next()
            .and_then(|item| item.decoded_content())
            .ok_or_else(|| TriageError::GitHub(format!("{path} has no content at {reference}")))
    }
}

#[derive(Serialize)]
struct PageParams {
    per_page: u8,
    page: u32,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

fn parse_graphql<T: for<'de> Deserialize<'de>>(
    response: serde_json::Value,
) -> Result<T, TriageError> {
    let parsed: GraphQlResponse<T> = serde_json::from_value(response)?;
    if !parsed.errors.is_empty() {
        let messages: Vec<String> = parsed.errors.into_iter().map(|e| e.message).collect();
        return Err(TriageError::GitHub(messages.join("; ")));
    }
    parsed
        .data
        .ok_or_else(|| TriageError::GitHub("empty GraphQL response".into()))
}

#[derive(Debug, Deserialize)]
struct SearchData {
    search: SearchConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchConnection {
    page_info: PageInfo,
    #[serde(default)]
    nodes: Vec<SearchNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CountData {
    search: CountConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CountConnection {
    issue_count: u64,
}

/// Search results mix pull requests with issues; issues come back as empty
/// objects.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SearchNode {
    PullRequest(Box<PullRequestNode>),
    Other(serde_json::Value),
}

impl SearchNode {
    fn into_pull_request(self) -> Option<PullRequest> {
        match self {
            SearchNode::PullRequest(node) => Some((*node).into()),
            SearchNode::Other(_) => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestNode {
    number: u64,
    url: String,
    title: String,
    #[serde(default)]
    body: String,
    created_at: DateTime<Utc>,
    author: Option<Login>,
    milestone: Option<Milestone>,
    repository: RepositoryNode,
    latest_reviews: Option<ReviewConnection>,
}

#[derive(Debug, Deserialize)]
struct Login {
    login: String,
}

#[derive(Debug, Deserialize)]
struct Milestone {
    title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryNode {
    name: String,
    is_private: bool,
}

#[derive(Debug, Deserialize)]
struct ReviewConnection {
    #[serde(default)]
    nodes: Vec<ReviewNode>,
}

#[derive(Debug, Deserialize)]
struct ReviewNode {
    state: String,
    author: Option<Login>,
}

impl From<PullRequestNode> for PullRequest {
    fn from(node: PullRequestNode) -> Self {
        let approvals = node
            .latest_reviews
            .map(|reviews| {
                reviews
                    .nodes
                    .into_iter()
                    .filter(|r| r.state == "APPROVED")
                    .filter_map(|r| r.author.map(|a| a.login))
                    .collect()
            })
            .unwrap_or_default();

        PullRequest {
            repository: node.repository.name,
            repository_private: node.repository.is_private,
            number: node.number,
            url: node.url,
            title: node.title,
            body: node.body,
            author: node.author.map(|a| a.login).unwrap_or_default(),
            created_at: node.created_at,
            milestone: node.milestone.map(|m| m.title),
            approvals,
        }
    }
}

#[derive(Debug, Deserialize)]
struct IssueResponse {
    number: u64,
    html_url: String,
    milestone: Option<Milestone>,
    #[serde(default)]
    labels: Vec<LabelResponse>,
}

#[derive(Debug, Deserialize)]
struct LabelResponse {
    name: String,
}

impl From<IssueResponse> for LinkedIssue {
    fn from(issue: IssueResponse) -> Self {
        LinkedIssue {
            number: issue.number,
            url: issue.html_url,
            milestone: issue.milestone.map(|m| m.title),
            labels: issue.labels.into_iter().map(|l| l.name).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BranchResponse {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use prtriage_core::Priority;

    fn search_response() -> serde_json::Value {
        serde_json::json!({
            "data": {
                "search": {
                    "issueCount": 2,
                    "pageInfo": { "hasNextPage": false, "endCursor": "Y3Vyc29yOjI=" },
                    "nodes": [
                        {
                            "number": 31337,
                            "url": "https://github.com/PrestaShop/PrestaShop/pull/31337",
                            "title": "Fix cart rules",
                            "body": "| Category? | BO\n| Type? | bug fix",
                            "createdAt": "2024-02-01T10:00:00Z",
                            "author": { "login": "carol" },
                            "milestone": { "title": "8.1.4" },
                            "repository": { "name": "PrestaShop", "isPrivate": false },
                            "latestReviews": { "nodes": [
                                { "state": "APPROVED", "author": { "login": "alice" } },
                                { "state": "CHANGES_REQUESTED", "author": { "login": "bob" } },
                                { "state": "APPROVED", "author": null }
                            ] }
                        },
                        {}
                    ]
                }
            }
        })
    }

    #[test]
    fn parse_search_page() {
        let page = parse_graphql::<SearchData>(search_response()).unwrap().search;
        assert!(!page.page_info.has_next_page);
        let prs: Vec<PullRequest> = page
            .nodes
            .into_iter()
            .filter_map(SearchNode::into_pull_request)
            .collect();
        assert_eq!(prs.len(), 1);

        let pr = &prs[0];
        assert_eq!(pr.repository, "PrestaShop");
        assert_eq!(pr.number, 31337);
        assert_eq!(pr.author, "carol");
        assert_eq!(pr.milestone.as_deref(), Some("8.1.4"));
        assert_eq!(pr.approvals, vec!["alice"]);
        assert!(!pr.repository_private);
    }

    #[test]
    fn ghost_author_becomes_empty_login() {
        let mut response = search_response();
        response["data"]["search"]["nodes"][0]["author"] = serde_json::Value::Null;
        response["data"]["search"]["nodes"][0]["milestone"] = serde_json::Value::Null;
        let page = parse_graphql::<SearchData>(response).unwrap().search;
        let pr = page.nodes.into_iter().find_map(SearchNode::into_pull_request).unwrap();
        assert_eq!(pr.author, "");
        assert!(pr.milestone.is_none());
    }

    #[test]
    fn graphql_errors_are_reported() {
        let response = serde_json::json!({
            "data": null,
            "errors": [{ "message": "rate limited" }, { "message": "try later" }]
        });
        let err = parse_graphql::<SearchData>(response).unwrap_err();
        assert_eq!(err.to_string(), "GitHub error: rate limited; try later");
    }

    #[test]
    fn parse_count() {
        let response = serde_json::json!({ "data": { "search": { "issueCount": 42 } } });
        assert_eq!(parse_graphql::<CountData>(response).unwrap().search.issue_count, 42);
    }

    #[test]
    fn issue_labels_give_priority() {
        let issue: IssueResponse = serde_json::from_value(serde_json::json!({
            "number": 12,
            "html_url": "https://github.com/PrestaShop/PrestaShop/issues/12",
            "milestone": null,
            "labels": [{ "name": "Bug" }, { "name": "Must-have" }]
        }))
        .unwrap();
        let linked: LinkedIssue = issue.into();
        assert_eq!(linked.priority(), Priority::MustHave);
        assert!(linked.milestone.is_none());
    }
}
