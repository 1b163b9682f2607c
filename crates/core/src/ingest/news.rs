use crate::domain::news::Article;
use anyhow::Result;
use chrono::NaiveDate;

#[async_trait::async_trait]
pub trait NewsSource: Send + Sync {
    fn source_name(&self) -> &'static str;

    async fn fetch(&self, ticker: &str, date: NaiveDate) -> Result<Vec<Article>>;
}

/// Placeholder feed: the same two headlines for any ticker and date.
#[derive(Debug, Clone, Default)]
pub struct CannedNewsSource;

#[async_trait::async_trait]
impl NewsSource for CannedNewsSource {
    fn source_name(&self) -> &'static str {
        "canned"
    }

    async fn fetch(&self, ticker: &str, date: NaiveDate) -> Result<Vec<Article>> {
        Ok(vec![
            Article {
                title: format!("{ticker} posts stronger-than-expected results"),
                description: format!("Investors reacted to {ticker}'s better performance."),
                source_name: "MockWire".to_string(),
                url: "https://example.com/article1".to_string(),
                published_at: format!("{date}T14:00:00Z"),
            },
            Article {
                title: format!("Sector peers rally, lifting {ticker}"),
                description: "Broader sector strength supported the stock.".to_string(),
                source_name: "MockFinance".to_string(),
                url: "https://example.com/article2".to_string(),
                published_at: format!("{date}T09:30:00Z"),
            },
        ])
    }
}
