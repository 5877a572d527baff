//! Server-rendered HTML for the prediction form, the result and the model info pages

use crate::ml::{FeatureEncoder, FeatureKind, FieldViolation, ModelInfo, PredictionResponse};
use crate::recommendations::{Advice, RecommendationSource};
use std::collections::BTreeMap;

/// Append one formatted line to a page body
macro_rules! push_line {
    ($body:expr, $($arg:tt)*) => {{
        $body.push_str(&format!($($arg)*));
        $body.push('\n');
    }};
}

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; background: #f4f6f8; color: #1f2933; }
header { background: #1f3a5f; color: #fff; padding: 1rem 2rem; }
header a { color: #cfe3ff; margin-right: 1rem; text-decoration: none; }
main { max-width: 56rem; margin: 2rem auto; background: #fff; padding: 2rem; border-radius: 8px; }
label { display: block; margin-top: 1rem; font-weight: 600; }
input, select { width: 100%; padding: .5rem; margin-top: .25rem; box-sizing: border-box; }
button { margin-top: 1.5rem; padding: .75rem 1.5rem; background: #1f3a5f; color: #fff; border: 0; border-radius: 4px; }
.error { color: #b42318; font-size: .9rem; }
.outcome { font-size: 1.6rem; font-weight: 700; }
.outcome.alert { color: #b42318; }
.outcome.ok { color: #067647; }
.cards { display: grid; grid-template-columns: repeat(auto-fit, minmax(12rem, 1fr)); gap: 1rem; }
.card { border: 1px solid #d0d5dd; border-radius: 6px; padding: 1rem; }
.priority-high { border-left: 4px solid #b42318; }
.priority-medium { border-left: 4px solid #dc6803; }
.priority-low { border-left: 4px solid #067647; }
table { border-collapse: collapse; width: 100%; }
td, th { border-bottom: 1px solid #eaecf0; padding: .4rem; text-align: left; }
"#;

/// Escape text for HTML element and attribute content
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} | Machine Maintenance Predictor</title>
<link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.5.1/css/all.min.css">
<style>{style}</style>
</head>
<body>
<header><strong>Machine Maintenance Predictor</strong> <a href="/">Predict</a><a href="/info">Model</a></header>
<main>
{body}
</main>
</body>
</html>
"#,
        title = escape_html(title),
        style = STYLE,
        body = body
    )
}

/// The prediction form, refilled with submitted values and their violations
pub fn form_page(
    info: &ModelInfo<'_>,
    encoder: &FeatureEncoder,
    submitted: &BTreeMap<String, String>,
    violations: &[FieldViolation],
) -> String {
    let mut body = String::new();
    body.push_str("<h1>Predict Maintenance Needs</h1>\n");
    push_line!(
        body,
        "<p>Enter the current machine readings. Model: {} (v{}).</p>",
        escape_html(&info.metadata.model_type.to_string()),
        escape_html(&info.metadata.version)
    );

    if !violations.is_empty() {
        body.push_str("<p class=\"error\">Please correct the highlighted fields.</p>\n");
    }

    body.push_str("<form method=\"post\" action=\"/predict\">\n");
    for spec in &info.schema.features {
        let unit = spec
            .unit
            .as_deref()
            .map(|u| format!(" ({})", escape_html(u)))
            .unwrap_or_default();
        push_line!(
            body,
            "<label for=\"{key}\">{label}{unit}</label>",
            key = escape_html(&spec.key),
            label = escape_html(&spec.label),
            unit = unit
        );

        let current = submitted.get(&spec.key).map(String::as_str).unwrap_or("");
        match spec.kind {
            FeatureKind::Numeric => {
                let placeholder = info
                    .ranges
                    .get(spec.key.as_str())
                    .map(|r| format!(" placeholder=\"{} to {}\"", r.min, r.max))
                    .unwrap_or_default();
                push_line!(
                    body,
                    "<input type=\"number\" step=\"any\" id=\"{key}\" name=\"{key}\" value=\"{value}\"{placeholder} required>",
                    key = escape_html(&spec.key),
                    value = escape_html(current),
                    placeholder = placeholder
                );
            }
            FeatureKind::Categorical => {
                push_line!(
                    body,
                    "<select id=\"{key}\" name=\"{key}\">",
                    key = escape_html(&spec.key)
                );
                for option in encoder.categories(&spec.key) {
                    let selected = if option.as_str() == current { " selected" } else { "" };
                    push_line!(
                        body,
                        "<option value=\"{v}\"{selected}>{v}</option>",
                        v = escape_html(option),
                        selected = selected
                    );
                }
                body.push_str("</select>\n");
            }
        }

        for violation in violations.iter().filter(|v| v.field == spec.key) {
            push_line!(
                body,
                "<div class=\"error\">{}</div>",
                escape_html(&violation.message)
            );
        }
    }
    body.push_str("<button type=\"submit\"><i class=\"fas fa-magnifying-glass-chart\"></i> Predict</button>\n</form>\n");

    layout("Predict", &body)
}

/// Prediction outcome, derived context and recommendations
pub fn result_page(response: &PredictionResponse, advice: &Advice) -> String {
    let outcome = &response.outcome;
    let class = if outcome.value.requires_maintenance {
        "alert"
    } else {
        "ok"
    };

    let mut body = String::new();
    body.push_str("<h1>Prediction Result</h1>\n");
    push_line!(
        body,
        "<p class=\"outcome {}\">{}</p>\n<p>Confidence: {:.1}%</p>",
        class,
        escape_html(&outcome.value.display),
        outcome.confidence * 100.0
    );

    body.push_str("<h2>Submitted Readings</h2>\n<table>\n");
    for input in &response.inputs {
        push_line!(
            body,
            "<tr><th>{}</th><td>{} {}</td></tr>",
            escape_html(&input.label),
            escape_html(&input.value.to_string()),
            escape_html(input.unit.as_deref().unwrap_or(""))
        );
    }
    body.push_str("</table>\n");

    if let Some(context) = &response.context {
        push_line!(
            body,
            r#"<h2>Operating Context</h2>
<div class="cards">
<div class="card"><i class="fas fa-temperature-half"></i> Air: {:.1}°C</div>
<div class="card"><i class="fas fa-fire"></i> Process: {:.1}°C</div>
<div class="card"><i class="fas fa-arrows-up-down"></i> Differential: {:.1} K</div>
<div class="card"><i class="fas fa-bolt"></i> Power: {:.2} kW</div>
</div>"#,
            context.air_temp_c, context.process_temp_c, context.temp_diff, context.power_estimate_kw
        );
    }

    let source = match advice.source {
        RecommendationSource::Ai => "AI-generated",
        RecommendationSource::Rules => "Rule-based",
    };
    push_line!(body, "<h2>Recommendations <small>({})</small></h2>", source);
    body.push_str("<div class=\"cards\">\n");
    for rec in &advice.recommendations {
        push_line!(
            body,
            "<div class=\"card priority-{priority}\"><h3><i class=\"{icon}\"></i> {title}</h3><p>{description}</p><small>Priority: {priority}</small></div>",
            priority = rec.priority,
            icon = escape_html(&rec.icon),
            title = escape_html(&rec.title),
            description = escape_html(&rec.description)
        );
    }
    body.push_str("</div>\n<p><a href=\"/\">Make another prediction</a></p>\n");

    layout("Result", &body)
}

/// Model type, training time, sample counts, metrics and features
pub fn info_page(info: &ModelInfo<'_>) -> String {
    let meta = info.metadata;
    let eval = &meta.evaluation_metrics;

    let mut body = String::new();
    push_line!(
        body,
        r#"<h1>Model Information</h1>
<table>
<tr><th>Name</th><td>{name}</td></tr>
<tr><th>Type</th><td>{model_type}</td></tr>
<tr><th>Version</th><td>{version}</td></tr>
<tr><th>Trained at</th><td>{trained_at}</td></tr>
<tr><th>Training samples</th><td>{n_train}</td></tr>
<tr><th>Evaluation samples</th><td>{n_eval}</td></tr>
<tr><th>Classes</th><td>{classes}</td></tr>
</table>"#,
        name = escape_html(&meta.name),
        model_type = escape_html(&meta.model_type.to_string()),
        version = escape_html(&meta.version),
        trained_at = meta.trained_at.format("%Y-%m-%d %H:%M:%S UTC"),
        n_train = meta.n_training_samples,
        n_eval = meta.n_evaluation_samples,
        classes = escape_html(&info.classes.join(", "))
    );

    push_line!(
        body,
        r#"<h2>Evaluation Metrics</h2>
<table>
<tr><th>Accuracy</th><td>{:.4}</td></tr>
<tr><th>Precision (macro)</th><td>{:.4}</td></tr>
<tr><th>Recall (macro)</th><td>{:.4}</td></tr>
<tr><th>F1 score (macro)</th><td>{:.4}</td></tr>
</table>"#,
        eval.accuracy, eval.precision, eval.recall, eval.f1_score
    );

    body.push_str("<h2>Features</h2>\n<table>\n<tr><th>Key</th><th>Label</th><th>Column</th><th>Unit</th><th>Training range</th></tr>\n");
    for spec in &info.schema.features {
        let range = info
            .ranges
            .get(spec.key.as_str())
            .map(|r| format!("{} to {}", r.min, r.max))
            .unwrap_or_else(|| "-".to_string());
        push_line!(
            body,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape_html(&spec.key),
            escape_html(&spec.label),
            escape_html(&spec.column),
            escape_html(spec.unit.as_deref().unwrap_or("-")),
            range
        );
    }
    body.push_str("</table>\n");

    if !meta.hyperparameters.is_empty() {
        body.push_str("<h2>Hyperparameters</h2>\n<table>\n");
        for (name, value) in &meta.hyperparameters {
            push_line!(
                body,
                "<tr><th>{}</th><td>{}</td></tr>",
                escape_html(name),
                escape_html(value)
            );
        }
        body.push_str("</table>\n");
    }

    layout("Model", &body)
}
