//! Stock quote tool backed by Stooq's daily-quote CSV endpoint.
//!
//! Stooq serves one CSV row per symbol with no API key required. US
//! tickers are addressed as `<symbol>.us`; an unlisted symbol comes back
//! with `N/D` in every price column and is reported as a soft failure.

use async_trait::async_trait;
use papertalk_core::error::ToolError;
use papertalk_core::tool::{Tool, ToolResult};
use tracing::warn;

pub struct StockPriceTool {
    client: reqwest::Client,
}

impl StockPriceTool {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for StockPriceTool {
    fn name(&self) -> &str {
        "stock_price"
    }

    fn description(&self) -> &str {
        "Get the latest quote for a US stock ticker symbol. Returns the closing price, currency, and quote timestamp."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "symbol": {
                    "type": "string",
                    "description": "The ticker symbol, e.g. 'AAPL' or 'MSFT'"
                }
            },
            "required": ["symbol"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let symbol = arguments["symbol"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'symbol' argument".into()))?
            .trim()
            .to_uppercase();

        if symbol.is_empty() || !symbol.chars().all(|c| c.is_ascii_alphanumeric() || c == '.') {
            return Err(ToolError::InvalidArguments(format!(
                "Invalid ticker symbol '{symbol}'"
            )));
        }

        let url = format!(
            "https://stooq.com/q/l/?s={}.us&f=sd2t2ohlcv&h&e=csv",
            symbol.to_lowercase()
        );

        let response = match self.client.get(&url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(%symbol, error = %e, "Stock quote request failed");
                return Ok(ToolResult::error(format!("Quote request failed: {e}")));
            }
        };

        if !response.status().is_success() {
            return Ok(ToolResult::error(format!(
                "Quote service returned HTTP {}",
                response.status().as_u16()
            )));
        }

        let csv = match response.text().await {
            Ok(text) => text,
            Err(e) => return Ok(ToolResult::error(format!("Quote response unreadable: {e}"))),
        };

        match parse_quote(&csv, &symbol) {
            Ok(quote) => {
                let output = format!(
                    "{} closed at {} {} on {}",
                    quote["symbol"].as_str().unwrap_or(&symbol),
                    quote["price"],
                    quote["currency"].as_str().unwrap_or("USD"),
                    quote["timestamp"].as_str().unwrap_or("unknown date"),
                );
                Ok(ToolResult::ok(output, Some(quote)))
            }
            Err(reason) => Ok(ToolResult::error(reason)),
        }
    }
}

/// Parse the two-line Stooq CSV (`Symbol,Date,Time,Open,High,Low,Close,Volume`).
fn parse_quote(csv: &str, symbol: &str) -> Result<serde_json::Value, String> {
    let row = csv
        .lines()
        .nth(1)
        .ok_or_else(|| format!("No quote data returned for '{symbol}'"))?;

    let fields: Vec<&str> = row.split(',').collect();
    if fields.len() < 7 {
        return Err(format!("Malformed quote row for '{symbol}'"));
    }

    let close = fields[6];
    if close == "N/D" {
        return Err(format!("'{symbol}' is not a listed US ticker symbol"));
    }

    let price: f64 = close
        .parse()
        .map_err(|_| format!("Unparseable closing price '{close}' for '{symbol}'"))?;

    Ok(serde_json::json!({
        "symbol": symbol,
        "price": price,
        "currency": "USD",
        "timestamp": format!("{} {}", fields[1], fields[2]),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_quote() {
        let csv = "Symbol,Date,Time,Open,High,Low,Close,Volume\n\
                   AAPL.US,2025-06-27,22:00:06,201.89,203.22,200.0,201.08,73188571\n";
        let quote = parse_quote(csv, "AAPL").unwrap();
        assert_eq!(quote["symbol"], "AAPL");
        assert_eq!(quote["price"], 201.08);
        assert_eq!(quote["currency"], "USD");
        assert!(quote["timestamp"].as_str().unwrap().contains("2025-06-27"));
    }

    #[test]
    fn unlisted_symbol_is_reported() {
        let csv = "Symbol,Date,Time,Open,High,Low,Close,Volume\n\
                   ZZZZZZ.US,N/D,N/D,N/D,N/D,N/D,N/D,N/D\n";
        let err = parse_quote(csv, "ZZZZZZ").unwrap_err();
        assert!(err.contains("not a listed"));
    }

    #[test]
    fn missing_row_is_an_error() {
        assert!(parse_quote("Symbol,Date,Time\n", "AAPL").is_err());
        assert!(parse_quote("", "AAPL").is_err());
    }

    #[tokio::test]
    async fn missing_symbol_is_invalid_arguments() {
        let tool = StockPriceTool::new(reqwest::Client::new());
        let err = tool.execute(serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn rejects_injection_in_symbol() {
        let tool = StockPriceTool::new(reqwest::Client::new());
        let err = tool
            .execute(serde_json::json!({"symbol": "AAPL&x=1"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[test]
    fn tool_definition() {
        let def = StockPriceTool::new(reqwest::Client::new()).to_definition();
        assert_eq!(def.name, "stock_price");
    }
}
