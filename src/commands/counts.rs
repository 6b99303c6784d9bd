use tabled::Tabled;

use circle::error::Result;
use circle::repository::CountKind;
use circle::tracker::{Count, Tracker};

use crate::output;

#[derive(Tabled)]
struct CountRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Issues")]
    count: u64,
    #[tabled(rename = "Key")]
    key: String,
}

impl From<&Count> for CountRow {
    fn from(count: &Count) -> Self {
        Self {
            name: count.name.clone(),
            count: count.count,
            key: count.key.clone(),
        }
    }
}

pub async fn show(tracker: &Tracker, kind: CountKind) -> Result<()> {
    let counts = tracker.counts(kind).await?;

    if counts.is_empty() && !output::is_json_output() {
        output::print_message("No issues found");
        return Ok(());
    }

    output::print_table(
        &counts,
        |c| CountRow::from(c),
        |c| format!("{}\t{}", c.key, c.count),
    );

    // Labels are many-to-many, so their buckets do not add up to the issue total.
    if kind != CountKind::Label && !output::is_json_output() {
        let total: u64 = counts.iter().map(|c| c.count).sum();
        output::print_message(&format!("Total: {total} issues by {kind}"));
    }

    Ok(())
}
