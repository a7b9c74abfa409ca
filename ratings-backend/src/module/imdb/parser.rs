//! IMDb TSV dataset parsers
//!
//! Line validation is pure (`parse_*_line`); the stream functions only skip
//! the header and collect. A bad line is dropped, never fatal; a read error
//! on the stream itself is, including one in place of the header.

use std::io;

use futures::{Stream, StreamExt};
use tracing::{debug, info};

use super::types::{EpisodeKey, EpisodeMapping, RatingRecord, RatingsMapping, NULL_SENTINEL};

const RATINGS_PROGRESS_INTERVAL: usize = 100_000;
const EPISODES_PROGRESS_INTERVAL: usize = 50_000;

/// Present, non-empty and not `\N`
fn required(field: Option<&str>) -> Option<&str> {
    field.filter(|v| !v.is_empty() && *v != NULL_SENTINEL)
}

/// Render a rating with exactly one fractional digit, ties rounded up.
/// Rejects anything that is not a finite number.
fn normalize_rating(raw: &str) -> Option<String> {
    let value: f64 = raw.trim().parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    // `{:.1}` alone rounds exact ties to even (7.25 -> "7.2").
    Some(format!("{:.1}", (value * 10.0).round() / 10.0))
}

/// Consume the header line. A read error there aborts the parse.
async fn skip_header<S>(lines: &mut S) -> io::Result<()>
where
    S: Stream<Item = io::Result<String>> + Unpin,
{
    lines.next().await.transpose()?;
    Ok(())
}

/// Parse one `title.ratings.tsv` line: `tconst \t averageRating \t numVotes [\t ...]`
pub fn parse_rating_line(line: &str) -> Option<RatingRecord> {
    let mut fields = line.split('\t');

    let title_id = required(fields.next())?;
    let rating = normalize_rating(required(fields.next())?)?;
    let vote_count = required(fields.next()).unwrap_or("0");

    Some(RatingRecord {
        title_id: title_id.to_string(),
        rating,
        vote_count: vote_count.to_string(),
    })
}

/// Parse one `title.episode.tsv` line:
/// `tconst \t parentTconst \t seasonNumber \t episodeNumber [\t ...]`
pub fn parse_episode_line(line: &str) -> Option<(EpisodeKey, String)> {
    let mut fields = line.split('\t');

    let episode_id = required(fields.next())?;
    let series_id = required(fields.next())?;
    let season = required(fields.next())?;
    let episode = required(fields.next())?;

    Some((
        EpisodeKey::new(series_id, season, episode),
        episode_id.to_string(),
    ))
}

/// Build a fresh ratings mapping from a dataset line stream (first line is the header).
pub async fn parse_ratings<S>(lines: S) -> io::Result<RatingsMapping>
where
    S: Stream<Item = io::Result<String>> + Unpin,
{
    let mut mapping = RatingsMapping::new();
    let mut lines = lines;
    skip_header(&mut lines).await?;
    let mut accepted = 0usize;

    while let Some(line) = lines.next().await {
        let Some(record) = parse_rating_line(&line?) else {
            continue;
        };
        mapping.insert(record.title_id.clone(), record);
        accepted += 1;

        if accepted % RATINGS_PROGRESS_INTERVAL == 0 {
            debug!("Processed {} ratings...", accepted);
        }
    }

    info!("Loaded {} ratings", mapping.len());
    Ok(mapping)
}

/// Build a fresh episode mapping from a dataset line stream (first line is the header).
pub async fn parse_episodes<S>(lines: S) -> io::Result<EpisodeMapping>
where
    S: Stream<Item = io::Result<String>> + Unpin,
{
    let mut mapping = EpisodeMapping::new();
    let mut lines = lines;
    skip_header(&mut lines).await?;
    let mut accepted = 0usize;

    while let Some(line) = lines.next().await {
        let Some((key, episode_id)) = parse_episode_line(&line?) else {
            continue;
        };
        mapping.insert(key, episode_id);
        accepted += 1;

        if accepted % EPISODES_PROGRESS_INTERVAL == 0 {
            debug!("Processed {} episodes...", accepted);
        }
    }

    info!("Loaded {} episode mappings", mapping.len());
    Ok(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn lines(raw: &[&str]) -> impl Stream<Item = io::Result<String>> + Unpin {
        stream::iter(raw.iter().map(|l| Ok(l.to_string())).collect::<Vec<_>>())
    }

    #[test]
    fn test_parse_rating_line_ok() {
        let record = parse_rating_line("tt0111161\t9.3\t2800000\t0").unwrap();
        assert_eq!(record.title_id, "tt0111161");
        assert_eq!(record.rating, "9.3");
        assert_eq!(record.vote_count, "2800000");
    }

    #[test]
    fn test_rating_normalized_to_one_decimal() {
        assert_eq!(parse_rating_line("tt1\t9\t5").unwrap().rating, "9.0");
        assert_eq!(parse_rating_line("tt1\t7.24\t5").unwrap().rating, "7.2");
        assert_eq!(parse_rating_line("tt1\t7.26\t5").unwrap().rating, "7.3");
        // Exact ties round up, not to even.
        assert_eq!(parse_rating_line("tt1\t7.25\t5").unwrap().rating, "7.3");
        assert_eq!(parse_rating_line("tt1\t9.25\t5").unwrap().rating, "9.3");
        assert_eq!(parse_rating_line("tt1\t6.75\t5").unwrap().rating, "6.8");
        assert_eq!(parse_rating_line("tt1\t10\t5").unwrap().rating, "10.0");
        assert_eq!(parse_rating_line("tt1\t 8.0 \t5").unwrap().rating, "8.0");
    }

    #[test]
    fn test_votes_default_to_zero() {
        assert_eq!(parse_rating_line("tt1\t6.1").unwrap().vote_count, "0");
        assert_eq!(parse_rating_line("tt1\t6.1\t").unwrap().vote_count, "0");
        assert_eq!(parse_rating_line("tt1\t6.1\t\\N").unwrap().vote_count, "0");
    }

    #[test]
    fn test_rejected_rating_lines() {
        assert!(parse_rating_line("").is_none());
        assert!(parse_rating_line("\t9.3\t10").is_none());
        assert!(parse_rating_line("tt1").is_none());
        assert!(parse_rating_line("tt1\t\t10").is_none());
        assert!(parse_rating_line("tt1\t\\N\t10").is_none());
        assert!(parse_rating_line("tt1\tN/A\t10").is_none());
        assert!(parse_rating_line("tt1\tNaN\t10").is_none());
        assert!(parse_rating_line("tt1\tinf\t10").is_none());
    }

    #[test]
    fn test_parse_episode_line() {
        let (key, episode_id) = parse_episode_line("tt0579539\ttt0903747\t1\t1").unwrap();
        assert_eq!(key, EpisodeKey::new("tt0903747", "1", "1"));
        assert_eq!(episode_id, "tt0579539");

        // Raw strings are kept, no numeric normalization.
        let (key, _) = parse_episode_line("tt2\ttt1\t01\t007\textra").unwrap();
        assert_eq!(key, EpisodeKey::new("tt1", "01", "007"));
    }

    #[test]
    fn test_rejected_episode_lines() {
        assert!(parse_episode_line("tt2\ttt1\t1").is_none());
        assert!(parse_episode_line("tt2\ttt1\t\\N\t1").is_none());
        assert!(parse_episode_line("tt2\ttt1\t1\t\\N").is_none());
        assert!(parse_episode_line("tt2\t\t1\t1").is_none());
        assert!(parse_episode_line("\ttt1\t1\t1").is_none());
    }

    #[tokio::test]
    async fn test_parse_ratings_skips_header_and_bad_lines() {
        let mapping = parse_ratings(lines(&[
            "tt9999999\t1.0\t1",
            "tt0111161\t9.3\t2800000\t0",
            "tt0000001\t\\N\t5",
            "garbage",
            "tt0068646\t9.2\t1900000",
        ]))
        .await
        .unwrap();

        // First line is always a header, even when it looks like data.
        assert!(!mapping.contains_key("tt9999999"));
        assert!(!mapping.contains_key("tt0000001"));
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping["tt0068646"].rating, "9.2");
    }

    #[tokio::test]
    async fn test_parse_episodes_last_write_wins() {
        let mapping = parse_episodes(lines(&[
            "tconst\tparentTconst\tseasonNumber\tepisodeNumber",
            "tt0579539\ttt0903747\t1\t1",
            "tt0000002\ttt0903747\t\\N\t\\N",
            "tt0000003\ttt0903747\t1\t1",
        ]))
        .await
        .unwrap();

        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping[&EpisodeKey::new("tt0903747", "1", "1")], "tt0000003");
    }

    #[tokio::test]
    async fn test_parse_returns_fresh_mapping_each_time() {
        let raw = ["h", "tt1\t5.0\t1"];
        let first = parse_ratings(lines(&raw)).await.unwrap();
        let second = parse_ratings(lines(&["h"])).await.unwrap();
        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn test_stream_error_aborts_parse() {
        let items = vec![
            Ok("header".to_string()),
            Ok("tt1\t5.0\t1".to_string()),
            Err(io::Error::new(io::ErrorKind::InvalidData, "corrupt deflate stream")),
            Ok("tt2\t6.0\t1".to_string()),
        ];
        let result = parse_ratings(stream::iter(items)).await;
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn test_error_in_place_of_header_aborts_parse() {
        let broken = || {
            stream::iter(vec![Err::<String, _>(io::Error::new(
                io::ErrorKind::InvalidData,
                "invalid gzip header",
            ))])
        };

        let err = parse_ratings(broken()).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        let err = parse_episodes(broken()).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn test_corrupt_gzip_file_is_an_error_not_an_empty_mapping() {
        use crate::module::imdb::fetcher::DatasetLines;

        let dir = tempfile::TempDir::new().unwrap();
        let file = tempfile::Builder::new()
            .suffix(".gz")
            .tempfile_in(dir.path())
            .unwrap();
        std::fs::write(file.path(), b"definitely not gzip data").unwrap();
        let lines = DatasetLines::open(file.into_temp_path()).await.unwrap();

        assert!(parse_ratings(lines).await.is_err());
    }

    #[tokio::test]
    async fn test_empty_stream() {
        assert!(parse_ratings(lines(&[])).await.unwrap().is_empty());
        assert!(parse_episodes(lines(&[])).await.unwrap().is_empty());
    }
}
