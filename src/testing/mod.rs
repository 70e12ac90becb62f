//! Testing utilities and mock collaborators.
//!
//! Mocks for every collaborator the pool drives, so scheduling behaviour can
//! be exercised without a browser or the data service.
//!
//! ```rust,ignore
//! use prometheus_scrape_pool::testing::{MockContextFactory, MockPipeline};
//! use prometheus_scrape_pool::infra::StaticItemSource;
//!
//! let contexts = MockContextFactory::new();
//! let pipeline = MockPipeline::new().with_delay(Duration::from_millis(50));
//! let source = Arc::new(StaticItemSource::new(fixtures::tickers(10)));
//! ```

mod mock_context;
mod mock_pipeline;

pub use mock_context::{MockContext, MockContextFactory, MockPage, MockPageFactory};
pub use mock_pipeline::{MockBehaviour, MockPipeline};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::core::{DirectorInterest, DirectorTransaction, Readiness, ScrapedPage};

    /// `count` distinct ticker-like items: `T000`, `T001`, ...
    #[must_use]
    pub fn tickers(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("T{i:03}")).collect()
    }

    /// A director transaction row with plausible values.
    #[must_use]
    pub fn transaction(director: &str, kind: &str) -> DirectorTransaction {
        DirectorTransaction {
            date: "12/03/2024".to_string(),
            director_name: director.to_string(),
            transaction_type: kind.to_string(),
            amount: "10,000".to_string(),
            price: "$45.10".to_string(),
            value: "$451,000".to_string(),
            notes: "On-market trade".to_string(),
        }
    }

    /// A director interests row with plausible values.
    #[must_use]
    pub fn interest(director: &str) -> DirectorInterest {
        DirectorInterest {
            director: director.to_string(),
            last_notice: "03/04/2024".to_string(),
            direct_shares: "25,000".to_string(),
            indirect_shares: "N/A".to_string(),
            options: "0".to_string(),
            convertibles: "0".to_string(),
        }
    }

    /// A page with one row of each table and, optionally, a historical data link.
    #[must_use]
    pub fn page(with_download: bool) -> ScrapedPage {
        ScrapedPage {
            transactions: vec![transaction("J Smith", "Buy")],
            director_interests: vec![interest("J Smith")],
            historical_download_url: with_download
                .then(|| "https://example.invalid/history.csv".to_string()),
        }
    }

    /// Probe result: content present.
    #[must_use]
    pub const fn ready() -> Readiness {
        Readiness {
            challenged: false,
            content_ready: true,
        }
    }

    /// Probe result: challenge showing, content absent.
    #[must_use]
    pub const fn challenged() -> Readiness {
        Readiness {
            challenged: true,
            content_ready: false,
        }
    }

    /// Probe result: neither.
    #[must_use]
    pub const fn loading() -> Readiness {
        Readiness {
            challenged: false,
            content_ready: false,
        }
    }
}
