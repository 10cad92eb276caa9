/*!

Core of the consolidation analytics dashboard: takes a loosely-structured,
human-edited attendance table and coerces it into a stable, analyzable shape,
then filters it and derives the follow-up metrics.

The data flows one way:

```text
raw table -> normalize -> normalized table -> apply_filters + compute_metrics
```

Both steps are pure and synchronous; the caller owns fetching, caching and
presentation. See [manual] for the expected input shape and the accepted
column spellings.

Two conventions in this module are deliberate and data-specific, not bugs:
month ranges may wrap across the year boundary (November..February), and a
dataset whose parsed dates all fall on weekends flags every record as weekend
(a congregation that registers only on Saturdays). They may not generalize to
other datasets.

*/

mod config;
pub mod builder;
pub mod manual;
mod metrics;
mod normalize;
mod schema;

pub use crate::config::*;
pub use crate::metrics::{apply_filters, compute_metrics, FUNNEL_STAGES};
pub use crate::normalize::{normalize, parse_timestamp, MONTH_NAMES};
pub use crate::schema::{normalize_flag, resolve_columns, title_case, NO, UNSPECIFIED, YES};
