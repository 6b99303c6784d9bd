use tabled::Tabled;

use circle::error::Result;
use circle::tracker::Tracker;
use circle::types::Label;

use crate::output::{self, label_colored};

#[derive(Tabled)]
struct LabelRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Color")]
    color: String,
    #[tabled(rename = "ID")]
    id: String,
}

impl From<&Label> for LabelRow {
    fn from(label: &Label) -> Self {
        Self {
            name: label_colored(&label.name, &label.color),
            color: label.color.clone(),
            id: label.id.clone(),
        }
    }
}

pub async fn list(tracker: &Tracker) -> Result<()> {
    let labels = tracker.repository().list_labels().await?;

    if labels.is_empty() && !output::is_json_output() {
        output::print_message("No labels found");
        return Ok(());
    }

    output::print_table(&labels, |l| LabelRow::from(l), |l| l.name.clone());

    Ok(())
}
