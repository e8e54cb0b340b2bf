use ra_core::error::AppError;
use ra_source_fourchan::{parse_catalog, parse_thread, quoted_ids};

const THREAD: &str = include_str!("fixtures/thread.json");
const CATALOG: &str = include_str!("fixtures/catalog.json");
const MEDIA: &str = "https://i.4cdn.org";

#[test]
fn thread_flags_and_subject_come_from_op() {
    let thread = parse_thread("g", "570368", MEDIA, THREAD).unwrap();
    assert_eq!(thread.id, "570368");
    assert_eq!(thread.board, "g");
    assert!(thread.sticky);
    assert!(thread.closed);
    assert_eq!(thread.metadata["subject"], "The /g/ Wiki");
    assert_eq!(thread.posts.len(), 3);
}

#[test]
fn op_image_urls_and_metadata() {
    let thread = parse_thread("g", "570368", MEDIA, THREAD).unwrap();
    let op = &thread.posts[0];
    assert_eq!(op.id, "570368");
    assert_eq!(op.author.as_deref(), Some("Anonymous"));
    assert_eq!(op.timestamp.timestamp(), 1546293948);
    assert_eq!(op.metadata["capcode"], "mod");

    let image = &op.images[0];
    assert_eq!(image.url, "https://i.4cdn.org/g/1546293948883.png");
    assert_eq!(image.thumbnail.as_deref(), Some("https://i.4cdn.org/g/1546293948883s.jpg"));
    assert_eq!(image.md5.as_deref(), Some("P6fDNZVsCM5hSHSwzEbYWQ=="));
    assert_eq!(image.metadata["filename"], "wiki.png");
    assert_eq!(image.metadata["w"], 500);
}

#[test]
fn replies_follow_quote_links() {
    let thread = parse_thread("g", "570368", MEDIA, THREAD).unwrap();
    assert!(thread.posts[1].images.is_empty());
    assert_eq!(thread.posts[1].replies, vec!["570368"]);
    assert_eq!(thread.posts[2].replies, vec!["570368", "570370"]);
    assert_eq!(thread.posts[2].metadata["trip"], "!Ep8pui8Vw2");
}

#[test]
fn quoted_ids_ignores_cross_thread_links() {
    let html = concat!(
        r##"<a href="/g/thread/1#p2" class="quotelink">&gt;&gt;2</a> "##,
        r##"<a href="#p3">&gt;&gt;3</a>"##,
    );
    assert_eq!(quoted_ids(html), vec!["3"]);
    assert!(quoted_ids("no links here").is_empty());
}

#[test]
fn quoted_ids_accepts_any_attribute_form() {
    let html = concat!(
        "<a class='quotelink' href='#p10'>&gt;&gt;10</a><br>",
        "<a class=quotelink href=#p11>&gt;&gt;11</a><br>",
        r##"<a href="#p10" class="quotelink">&gt;&gt;10</a>"##,
    );
    assert_eq!(quoted_ids(html), vec!["10", "11"]);
}

#[test]
fn quoted_ids_skips_non_numeric_anchors() {
    let html = r##"<a href="#pics">pics</a> <a href="#p">&gt;&gt;</a> <span>#p5</span>"##;
    assert!(quoted_ids(html).is_empty());
}

#[test]
fn malformed_thread_is_a_source_error() {
    assert!(matches!(
        parse_thread("g", "1", MEDIA, "<html>404</html>"),
        Err(AppError::Source(_))
    ));
}

#[test]
fn catalog_flattens_pages() {
    let summaries = parse_catalog("g", 0, CATALOG).unwrap();
    assert_eq!(summaries.len(), 5);
    assert_eq!(summaries[0].id, "51971506");
    assert!(summaries[0].sticky && summaries[0].closed);
    assert_eq!(summaries[0].metadata["last_modified"], 1546294897);
    assert_eq!(summaries[1].metadata["subject"], "/dpt/");
    assert!(summaries[4].closed && !summaries[4].sticky);
}

#[test]
fn catalog_limit_caps_across_pages() {
    let summaries = parse_catalog("g", 4, CATALOG).unwrap();
    let ids: Vec<&str> = summaries.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["51971506", "76759434", "76761234", "76750001"]);
}
