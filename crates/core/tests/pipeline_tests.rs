//! End-to-end pipeline tests against a local mock server.

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use httpmock::prelude::*;
use fabula_core::{Client, ID_PUBLICATION, ID_TITLE, IdentifyRequest, SearchConfig};

const PUB_PAGE: &str = r#"
    <div id="content">
        <div class="ContentBox">
            <table>
                <tr>
                    <td><a href="/cgi-bin/pl.cgi?675613"><img src="https://images.example.net/covers/675613.jpg"></a></td>
                    <td class="pubheader">
                        <ul>
                            <li><b>Publication:</b> All Flesh Is Grass
                                <span class="recordID"><b>Publication Record # </b>675613</span></li>
                            <li><b>Authors:</b> <a href="/cgi-bin/ea.cgi?180">Clifford D. Simak</a></li>
                            <li><b>Date:</b> 1968-00-00</li>
                            <li><b>ISBN:</b> 0-330-02042-0 [978-0-330-02042-9]</li>
                            <li><b>Publisher:</b> <a href="/cgi-bin/publisher.cgi?62">Pan Books</a></li>
                            <li><b>Format:</b> pb</li>
                            <li><b>Type:</b> NOVEL</li>
                        </ul>
                    </td>
                </tr>
            </table>
        </div>
        <div class="ContentBox">
            <b>Contents</b>
            <ul>
                <li><a href="/cgi-bin/title.cgi?2946">All Flesh Is Grass</a> &#8226; novel by
                    <a href="/cgi-bin/ea.cgi?180">Clifford D. Simak</a></li>
            </ul>
        </div>
    </div>
"#;

const TITLE_PAGE: &str = r#"
    <div id="content">
        <div class="ContentBox">
            <b>Title:</b> All Flesh Is Grass
            <span class="recordID"><b>Title Record # </b>2946</span>
            <br><b>Author:</b> <a href="/cgi-bin/ea.cgi?180">Clifford D. Simak</a>
            <br><b>Date:</b> 1965-00-00
            <br><b>Type:</b> NOVEL
            <br><b>Language:</b> English
            <br><b>User Rating:</b> 7.40 (based on 5 votes)
        </div>
        <div class="ContentBox">
            <table class="publications">
                <tr><th>Title</th><th>Date</th><th>Publisher</th></tr>
                <tr>
                    <td><a href="/cgi-bin/pl.cgi?675613">All Flesh Is Grass</a></td>
                    <td>1968-00-00</td>
                    <td><a href="/cgi-bin/publisher.cgi?62">Pan Books</a></td>
                </tr>
            </table>
        </div>
    </div>
"#;

const PUB_RESULTS: &str = r#"
    <div id="main">
        <table>
            <tr><th>Title</th><th>Date</th><th>Authors</th></tr>
            <tr>
                <td><a href="/cgi-bin/pl.cgi?675613">All Flesh Is Grass</a></td>
                <td>1968-00-00</td>
                <td><a href="/cgi-bin/ea.cgi?180">Clifford D. Simak</a></td>
            </tr>
        </table>
    </div>
"#;

const TITLE_RESULTS: &str = r#"
    <div id="main">
        <form>
            <table>
                <tr><th>Date</th><th>Type</th><th>Language</th><th>Series</th><th>Title</th><th>Authors</th></tr>
                <tr>
                    <td>1965-00-00</td>
                    <td>NOVEL</td>
                    <td>English</td>
                    <td></td>
                    <td><a href="/cgi-bin/title.cgi?2946">All Flesh Is Grass</a></td>
                    <td><a href="/cgi-bin/ea.cgi?180">Clifford D. Simak</a></td>
                </tr>
            </table>
        </form>
    </div>
"#;

const SIMPLE_RESULTS: &str = r#"
    <div id="main">
        <table>
            <tr><th>Date</th><th>Type</th><th>Language</th><th>Title</th><th>Authors</th></tr>
            <tr>
                <td>1965-00-00</td>
                <td>NOVEL</td>
                <td>English</td>
                <td><a href="/cgi-bin/title.cgi?2946">All Flesh Is Grass</a></td>
                <td><a href="/cgi-bin/ea.cgi?180">Clifford D. Simak</a></td>
            </tr>
        </table>
    </div>
"#;

const REFUSAL_PAGE: &str = "<div id=\"main\">For performance reasons, Advanced Searches \
    are currently restricted to registered users.</div>";

const COVER_GALLERY: &str = r#"
    <div id="main">
        <a href="/cgi-bin/pl.cgi?675613"><img src="https://images.example.net/covers/675613.jpg"></a>
        <a href="/cgi-bin/pl.cgi?31061"><img src="https://images.example.net/covers/31061.jpg"></a>
    </div>
"#;

fn client(server: &MockServer) -> Client {
    let config = SearchConfig::builder().base_url(server.base_url()).timeout_secs(5).build();
    Client::new(config).unwrap()
}

fn mock_detail_pages(server: &MockServer) {
    server.mock(|when, then| {
        when.method(GET).path("/cgi-bin/pl.cgi");
        then.status(200).header("content-type", "text/html; charset=iso-8859-1").body(PUB_PAGE);
    });
    server.mock(|when, then| {
        when.method(GET).path("/cgi-bin/title.cgi");
        then.status(200).header("content-type", "text/html; charset=iso-8859-1").body(TITLE_PAGE);
    });
}

#[test]
fn test_identify_by_publication_id() {
    let server = MockServer::start();
    mock_detail_pages(&server);

    let client = client(&server);
    let mut request = IdentifyRequest::default();
    request.identifiers.insert(ID_PUBLICATION.to_string(), "675613".to_string());

    let records = client.identify(&request).unwrap();
    assert_eq!(records.len(), 1);

    let record = &records[0];
    assert_eq!(record.relevance, 0);
    assert_eq!(record.title, "All Flesh Is Grass (pub #675613)");
    assert_eq!(record.authors, vec!["Clifford D. Simak"]);
    assert_eq!(record.publisher.as_deref(), Some("Pan Books"));
    assert_eq!(record.identifiers.get("isbn").map(String::as_str), Some("9780330020429"));
    assert_eq!(record.identifiers.get(ID_TITLE).map(String::as_str), Some("2946"));
    // Rating rides in from the title side, halved to the 5-star scale.
    assert_eq!(record.rating, Some(3.7));

    // The worker caches the cover it saw.
    assert_eq!(
        client.caches().cached_cover_url("isfdb:675613").as_deref(),
        Some("https://images.example.net/covers/675613.jpg")
    );
}

#[test]
fn test_identify_by_isbn() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/cgi-bin/adv_search_results.cgi")
            .query_param("USE_1", "pub_isbn")
            .query_param("TERM_1", "0330020420");
        then.status(200).body(PUB_RESULTS);
    });
    mock_detail_pages(&server);

    let client = client(&server);
    let mut request = IdentifyRequest::default();
    request.identifiers.insert("isbn".to_string(), "0330020420".to_string());

    let records = client.identify(&request).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].relevance, 1);
    assert!(records[0].title.starts_with("All Flesh Is Grass"));
    assert_eq!(records[0].authors, vec!["Clifford D. Simak"]);
}

#[test]
fn test_identify_by_title_and_author_dedupes_stages() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/cgi-bin/adv_search_results.cgi").query_param("TYPE", "Title");
        then.status(200).body(TITLE_RESULTS);
    });
    // The publication stage reaches the same record; the candidate must
    // be deduplicated, keeping the best relevance.
    server.mock(|when, then| {
        when.method(GET).path("/cgi-bin/adv_search_results.cgi").query_param("TYPE", "Publication");
        then.status(200).body(PUB_RESULTS);
    });
    mock_detail_pages(&server);

    let client = client(&server);
    let request = IdentifyRequest {
        title: Some("All Flesh Is Grass".to_string()),
        authors: vec!["Simak, Clifford D.".to_string()],
        ..Default::default()
    };

    let records = client.identify(&request).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].relevance, 0);
    assert_eq!(records[0].title, "All Flesh Is Grass (pub #675613)");
}

#[test]
fn test_refused_advanced_search_falls_back_to_simple() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/cgi-bin/adv_search_results.cgi");
        then.status(200).body(REFUSAL_PAGE);
    });
    server.mock(|when, then| {
        when.method(GET).path("/cgi-bin/se.cgi");
        then.status(200).body(SIMPLE_RESULTS);
    });
    mock_detail_pages(&server);

    let client = client(&server);
    let request = IdentifyRequest {
        title: Some("All Flesh Is Grass".to_string()),
        authors: vec!["Clifford D. Simak".to_string()],
        ..Default::default()
    };

    let records = client.identify(&request).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title, "All Flesh Is Grass (pub #675613)");
}

#[test]
fn test_abort_returns_promptly_with_no_records() {
    let server = MockServer::start();
    mock_detail_pages(&server);

    let client = client(&server);
    client.abort_handle().store(true, Ordering::SeqCst);

    let mut request = IdentifyRequest::default();
    request.identifiers.insert(ID_PUBLICATION.to_string(), "675613".to_string());

    let started = Instant::now();
    let records = client.identify(&request).unwrap();
    assert!(records.is_empty());
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_covers_by_title_id() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/cgi-bin/titlecovers.cgi");
        then.status(200).body(COVER_GALLERY);
    });

    let client = client(&server);
    let mut request = IdentifyRequest::default();
    request.identifiers.insert(ID_TITLE.to_string(), "2946".to_string());

    let urls = client.find_covers(&request).unwrap();
    assert_eq!(
        urls,
        vec![
            "https://images.example.net/covers/675613.jpg",
            "https://images.example.net/covers/31061.jpg",
        ]
    );
}

#[test]
fn test_covers_from_cache_by_publication_id() {
    let server = MockServer::start();
    mock_detail_pages(&server);

    let client = client(&server);
    let mut request = IdentifyRequest::default();
    request.identifiers.insert(ID_PUBLICATION.to_string(), "675613".to_string());

    // Identify warms the cover cache; the covers call then needs no
    // further requests.
    client.identify(&request).unwrap();
    let urls = client.find_covers(&request).unwrap();
    assert_eq!(urls, vec!["https://images.example.net/covers/675613.jpg"]);
}
