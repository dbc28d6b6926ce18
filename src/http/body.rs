use futures_util::StreamExt;
use reqwest::Response;

/// Response body as seen by the classifier: a bounded prefix plus the full size.
#[derive(Debug, Default)]
pub(super) struct ReceivedBody {
    pub(super) retained: Vec<u8>,
    pub(super) total_bytes: u64,
    /// Set when bytes past the cap were dropped.
    pub(super) truncated: bool,
}

/// Reads the body to the end, keeping at most `keep` bytes.
pub(super) async fn read_body(
    response: Response,
    keep: usize,
) -> Result<ReceivedBody, reqwest::Error> {
    let mut stream = response.bytes_stream();
    let mut body = ReceivedBody::default();
    while let Some(chunk) = stream.next().await {
        let bytes = chunk?;
        body.total_bytes = body
            .total_bytes
            .saturating_add(u64::try_from(bytes.len()).unwrap_or(u64::MAX));
        let room = keep.saturating_sub(body.retained.len());
        let take = room.min(bytes.len());
        if take < bytes.len() {
            body.truncated = true;
        }
        if let Some(prefix) = bytes.get(..take) {
            body.retained.extend_from_slice(prefix);
        }
    }
    Ok(body)
}
