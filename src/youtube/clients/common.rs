/// InnerTube API base endpoint.
pub const INNERTUBE_API: &str = "https://www.youtube.com";

/// Default visitor ID sent when no session context exists.
pub const DEFAULT_VISITOR_ID: &str = "CgtQU3JVTUNmejVKYyjOsIvHBjIKCgJVUxIEGgAgJA%3D%3D";

/// Full player endpoint URL for a profile's API key.
pub fn player_endpoint(api_key: &str) -> String {
    format!(
        "{}/youtubei/v1/player?key={}&prettyPrint=false",
        INNERTUBE_API, api_key
    )
}
