// northstar-core/src/infrastructure/report/markdown.rs

// Renders a finished run as the weekly business review (Markdown).
// The run report is serialized into the template context as-is, so the template sees the
// same field names as run_report.json.

use minijinja::Environment;
use std::fs;
use std::path::Path;

use crate::application::ports::ReportRenderer;
use crate::application::report::RunReport;
use crate::error::NorthstarError;
use crate::infrastructure::error::InfrastructureError;

pub const BUSINESS_REVIEW_FILE: &str = "business_review.md";

const DEFAULT_TEMPLATE: &str = r#"# North Star Business Review

_Source: {{ source }} | Period: {{ period }} | Profile: {{ profile }} | Generated: {{ generated_at }}_

## Executive Summary

{% for ns in north_star %}
**{{ ns.display_name }}: {{ ns.value|fixed }} {{ ns.unit }}** (owner: {{ ns.owner }})

Formula: `{{ ns.formula }}`

{% for c in ns.components %}
- {{ c.display_name }}: {{ c.value|fixed }}
{% endfor %}

{% endfor %}
{% if decomposition %}
{% set d = decomposition.result %}
## What Moved and Why

{% if decomposition.basis == "frequency_cohorts" %}
No baseline period was provided. The comparison contrasts customers at or below the median order count with those above it.

{% endif %}
{{ d.period_1 }} -> {{ d.period_2 }}: {{ d.north_star_start|fixed }} -> {{ d.north_star_end|fixed }} ({{ d.total_change|signed }}, {{ d.percent_change|pct }})

| Step | Change | Cumulative |
|---|---:|---:|
{% for step in decomposition.waterfall %}
| {{ step.label }} | {{ step.delta|signed }} | {{ step.cumulative|fixed }} |
{% endfor %}

{% endif %}
{% macro metric_table(records) %}
| Metric | Kind | Value | Unit | Status | Owner |
|---|---|---:|---|---|---|
{% for r in records %}
| {{ r.display_name }} | {{ r.kind }} | {{ r.value|fixed(3) if r.value is not none else "n/a" }} | {{ r.unit }} | {{ r.status }} | {{ r.owner }} |
{% endfor %}
{% endmacro %}
## Executive Metrics

{{ metric_table(layers.executive) }}
## Diagnostic Metrics

{{ metric_table(layers.diagnostic) }}
{% macro segment_table(rows) %}
| Segment | Range | Customers | Customer share | Order share | Orders/customer | Items/order | VPAC |
|---|---|---:|---:|---:|---:|---:|---:|
{% for s in rows %}
| {{ s.segment }} | {{ s.range }} | {{ s.customers }} | {{ s.customer_share|pct }} | {{ s.order_share|pct }} | {{ s.orders_per_customer|fixed }} | {{ s.items_per_order|fixed }} | {{ s.vpac|fixed }} |
{% endfor %}
{% endmacro %}
## Customer Segments

{{ segment_table(segments) }}
## Basket Size Segments

{{ segment_table(basket_segments) }}
## Data Quality

{{ quality.summary.passed }}/{{ quality.summary.total }} checks passed, {{ quality.summary.warnings }} warning(s), {{ quality.summary.errors }} error(s).

{% for r in quality.results if not r.passed %}
- **{{ r.severity }}** `{{ r.check_name }}`: {{ r.message }}
{% endfor %}
{% if failures %}

## Computation Failures

{% for f in failures %}
- `{{ f.metric_id }}`: {{ f.reason }}
{% endfor %}
{% endif %}
{% if insights %}

## Key Insights

{% for line in insights %}
{{ loop.index }}. {{ line }}
{% endfor %}
{% endif %}
"#;

pub struct MarkdownRenderer {
    env: Environment<'static>,
}

impl MarkdownRenderer {
    pub fn new() -> Result<Self, InfrastructureError> {
        let mut env = base_environment();
        env.add_template(BUSINESS_REVIEW_FILE, DEFAULT_TEMPLATE)?;
        Ok(Self { env })
    }

    /// Uses a project-provided template instead of the built-in one.
    pub fn from_file(path: &Path) -> Result<Self, InfrastructureError> {
        if !path.is_file() {
            return Err(InfrastructureError::InputNotFound(
                path.display().to_string(),
            ));
        }
        let source = fs::read_to_string(path)?;
        let mut env = base_environment();
        env.add_template_owned(BUSINESS_REVIEW_FILE, source)?;
        Ok(Self { env })
    }
}

fn base_environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);

    env.add_filter("fixed", fixed);
    env.add_filter("signed", |value: f64| format!("{:+.2}", value));
    env.add_filter("pct", |value: f64| format!("{:.1}%", value * 100.0));
    env
}

fn fixed(value: f64, digits: Option<usize>) -> String {
    format!("{:.*}", digits.unwrap_or(2), value)
}

impl ReportRenderer for MarkdownRenderer {
    fn file_name(&self) -> &str {
        BUSINESS_REVIEW_FILE
    }

    fn render(&self, report: &RunReport) -> Result<String, NorthstarError> {
        let tmpl = self
            .env
            .get_template(BUSINESS_REVIEW_FILE)
            .map_err(InfrastructureError::TemplateError)?;
        let rendered = tmpl
            .render(report)
            .map_err(InfrastructureError::TemplateError)?;
        Ok(rendered)
    }
}
