//! Link extraction against canned listing and indirection pages.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use relay_core::common::{ProgressStatus, ScrapeProgress, ScrapedLink};
use relay_core::domains::scraping::{ExtractorConfig, LinkExtractor};
use relay_core::kernel::test_dependencies::MockPageFetcher;

use crate::common::*;

fn extractor(fetcher: MockPageFetcher) -> LinkExtractor {
    LinkExtractor::new(
        Arc::new(fetcher),
        ExtractorConfig::default().with_pacing(Duration::ZERO),
    )
    .unwrap()
}

async fn run(extractor: &LinkExtractor) -> Vec<ScrapeProgress> {
    extractor.extract(LISTING_URL).collect().await
}

#[tokio::test]
async fn two_of_three_links_resolve() {
    let links = [
        host_link("a1", "game.part1.rar"),
        host_link("a2", "game.part2.rar"),
        host_link("a3", "game.part3.rar"),
    ];
    let fetcher = MockPageFetcher::new()
        .with_page(LISTING_URL, &listing_page(&links))
        .with_page(&links[0], &indirection_page("https://fuckingfast.co/dl/a1"))
        .with_page(&links[1], &dead_indirection_page())
        .with_page(&links[2], &indirection_page("https://fuckingfast.co/dl/a3"));

    let events = run(&extractor(fetcher)).await;

    let shape: Vec<(ProgressStatus, usize, usize)> =
        events.iter().map(|e| (e.status, e.current, e.total)).collect();
    assert_eq!(
        shape,
        vec![
            (ProgressStatus::Started, 0, 3),
            (ProgressStatus::Processing, 1, 3),
            (ProgressStatus::Processing, 2, 3),
            (ProgressStatus::Error, 2, 3),
            (ProgressStatus::Processing, 3, 3),
            (ProgressStatus::Completed, 3, 3),
        ]
    );
    assert_eq!(events[1].filename.as_deref(), Some("game.part1.rar"));
    assert_eq!(events[3].filename.as_deref(), Some("game.part2.rar"));
    assert!(events[3].message.is_some());
    assert!(!events[3].is_terminal());

    assert_eq!(
        events[5].links,
        Some(vec![
            ScrapedLink::new("game.part1.rar", "https://fuckingfast.co/dl/a1"),
            ScrapedLink::new("game.part3.rar", "https://fuckingfast.co/dl/a3"),
        ])
    );
}

#[tokio::test]
async fn missing_section_is_a_single_error() {
    let fetcher = MockPageFetcher::new().with_page(LISTING_URL, &page_without_section());
    let ex = extractor(fetcher);

    let events = run(&ex).await;

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, ProgressStatus::Error);
    assert!(events[0].is_terminal());
}

#[tokio::test]
async fn section_without_host_links_is_a_single_error() {
    let links = ["https://mirror.test/file#x.rar".to_string()];
    let fetcher = MockPageFetcher::new().with_page(LISTING_URL, &listing_page(&links));

    let events = run(&extractor(fetcher)).await;

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, ProgressStatus::Error);
}

#[tokio::test]
async fn processing_counts_up_by_one_and_links_are_unique() {
    let links: Vec<String> = (1..=5)
        .map(|i| host_link(&format!("id{}", i), &format!("part{}.rar", i % 4)))
        .collect();
    let mut fetcher = MockPageFetcher::new().with_page(LISTING_URL, &listing_page(&links));
    for (i, link) in links.iter().enumerate() {
        fetcher = fetcher.with_page(
            link,
            &indirection_page(&format!("https://fuckingfast.co/dl/{}", i)),
        );
    }

    let events = run(&extractor(fetcher)).await;

    let currents: Vec<usize> = events
        .iter()
        .filter(|e| e.status == ProgressStatus::Processing)
        .map(|e| e.current)
        .collect();
    assert_eq!(currents, vec![1, 2, 3, 4, 5]);

    // part1.rar appears twice (ids 1 and 5); the first wins
    let completed = events.last().unwrap();
    assert_eq!(completed.status, ProgressStatus::Completed);
    let resolved = completed.links.clone().unwrap();
    let names: Vec<&str> = resolved.iter().map(|l| l.filename.as_str()).collect();
    assert_eq!(names, vec!["part1.rar", "part2.rar", "part3.rar", "part0.rar"]);
    assert_eq!(resolved[0].url, "https://fuckingfast.co/dl/0");
}

#[tokio::test]
async fn unreachable_indirection_page_is_reported_and_skipped() {
    let links = [host_link("a1", "one.rar"), host_link("gone", "two.rar")];
    let fetcher = MockPageFetcher::new()
        .with_page(LISTING_URL, &listing_page(&links))
        .with_page(&links[0], &indirection_page("https://fuckingfast.co/dl/a1"));

    let events = run(&extractor(fetcher)).await;

    let statuses: Vec<ProgressStatus> = events.iter().map(|e| e.status).collect();
    assert_eq!(
        statuses,
        vec![
            ProgressStatus::Started,
            ProgressStatus::Processing,
            ProgressStatus::Error,
            ProgressStatus::Completed,
        ]
    );
    assert_eq!(events[2].current, 2);
    assert_eq!(
        events[3].links,
        Some(vec![ScrapedLink::new("one.rar", "https://fuckingfast.co/dl/a1")])
    );
}

#[tokio::test]
async fn every_run_fetches_afresh() {
    let links = [host_link("a1", "one.rar")];
    let fetcher = Arc::new(
        MockPageFetcher::new()
            .with_page(LISTING_URL, &listing_page(&links))
            .with_page(&links[0], &indirection_page("https://fuckingfast.co/dl/a1")),
    );
    let ex = LinkExtractor::new(
        fetcher.clone(),
        ExtractorConfig::default().with_pacing(Duration::ZERO),
    )
    .unwrap();

    let first = ex.collect_links(LISTING_URL).await.unwrap();
    let second = ex.collect_links(LISTING_URL).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(fetcher.calls().len(), 4);
}

#[tokio::test]
async fn pacing_delay_applies_between_links() {
    let links = [host_link("a1", "one.rar"), host_link("a2", "two.rar"), host_link("a3", "three.rar")];
    let mut fetcher = MockPageFetcher::new().with_page(LISTING_URL, &listing_page(&links));
    for link in &links {
        fetcher = fetcher.with_page(link, &indirection_page("https://fuckingfast.co/dl/x"));
    }
    let ex = LinkExtractor::new(
        Arc::new(fetcher),
        ExtractorConfig::default().with_pacing(Duration::from_millis(30)),
    )
    .unwrap();

    let started = Instant::now();
    let links = ex.collect_links(LISTING_URL).await.unwrap();

    // Two gaps for three links
    assert!(started.elapsed() >= Duration::from_millis(60));
    assert_eq!(links.len(), 3);
}

#[tokio::test]
async fn collect_links_surfaces_structure_errors() {
    let fetcher = MockPageFetcher::new().with_page(LISTING_URL, &page_without_section());

    let result = extractor(fetcher).collect_links(LISTING_URL).await;

    assert!(result.is_err());
}

#[tokio::test]
async fn file_names_keep_spaces_and_accents() {
    let links = [host_link("a1", "Pokémon Game.part1.rar")];
    let fetcher = Arc::new(
        MockPageFetcher::new()
            .with_page(LISTING_URL, &listing_page(&links))
            .with_page(&links[0], &indirection_page("https://fuckingfast.co/dl/a1")),
    );
    let ex = LinkExtractor::new(
        fetcher.clone(),
        ExtractorConfig::default().with_pacing(Duration::ZERO),
    )
    .unwrap();

    let resolved = ex.collect_links(LISTING_URL).await.unwrap();

    assert_eq!(
        resolved,
        vec![ScrapedLink::new(
            "Pokémon Game.part1.rar",
            "https://fuckingfast.co/dl/a1"
        )]
    );
    // The indirection page is requested with the link as written on the page
    assert_eq!(
        fetcher.calls()[1],
        "https://fuckingfast.co/a1#Pokémon Game.part1.rar"
    );
}
