use std::collections::BTreeMap;

use tabled::{Table, Tabled};
use tabled::settings::{Alignment, Height, object::{Rows, Columns}, style::Style};

use crate::types::Sample;

/// Distribution of the reported status codes.
pub struct Stat {
    total: u64,
    statuses: BTreeMap<i64, u64>,
}

impl Stat {
    pub fn new(samples: &[Sample]) -> Stat {
        let mut stat = Stat {
            total: 0,
            statuses: BTreeMap::new(),
        };

        for sample in samples {
            *stat.statuses.entry(sample.status()).or_default() += 1;
            stat.total += 1;
        }

        stat
    }

    pub fn render(&self) -> Option<String> {
        if self.total == 0 {
            return None;
        }

        let rows: Vec<_> = self.statuses.iter().map(|(&status, &count)| StatRow {
            status,
            samples: count,
            percentage: format!("{:.1}%", count as f64 / self.total as f64 * 100.),
        }).collect();

        let mut table = Table::new(&rows);
        table.with(Style::blank());
        table.modify(Rows::first(), Height::increase(2));
        table.modify(Columns::new(1..), Alignment::right());

        Some(table.to_string())
    }
}

#[derive(Tabled)]
struct StatRow {
    #[tabled(rename = "Status")]
    status: i64,

    #[tabled(rename = "Samples")]
    samples: u64,

    #[tabled(rename = "Percentage")]
    percentage: String,
}
