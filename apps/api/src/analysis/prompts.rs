// Prompt templates for health document analysis.

pub const ANALYSIS_SYSTEM: &str = "\
You are an expert medical AI assistant analyzing health documents and blood test results. \
Your task is to: \
1. Extract all health metrics, biomarkers, and test results from the document. \
2. Categorize each metric's status as: excellent, good, attention, or critical. \
3. Calculate an overall Life Score (0-100) based on all health indicators. \
4. Provide key health insights highlighting important findings. \
5. Generate personalized lifestyle recommendations for diet, exercise, sleep, and stress management. \
You MUST respond with a single valid JSON object only. No markdown fences, no explanations.";

pub const ANALYSIS_PROMPT: &str = r#"Analyze this health document thoroughly. Extract all biomarkers, lab values, and health metrics.
For each metric found:
- Determine if it's excellent (optimal), good (normal), attention (borderline), or critical (abnormal)
- Note the normal reference range
- Categorize it (e.g., Blood Count, Lipid Profile, Liver Function, Kidney Function, Metabolic)

Calculate a Life Score (0-100) where:
- 80-100 = Excellent health (most metrics optimal)
- 60-79 = Good health (metrics mostly normal)
- 40-59 = Fair health (some concerning values)
- 0-39 = Needs attention (multiple critical values)

Provide insights about the most important findings and actionable lifestyle recommendations.

OUTPUT SCHEMA (return exactly this structure):
{
  "lifeScore": number,
  "summary": "string - 2-3 sentence overall health summary",
  "metrics": [
    {
      "name": "string",
      "value": "string",
      "unit": "string",
      "status": "excellent" | "good" | "attention" | "critical",
      "normalRange": "string",
      "category": "string"
    }
  ],
  "insights": [
    {
      "category": "string",
      "title": "string",
      "description": "string",
      "severity": "low" | "medium" | "high"
    }
  ],
  "recommendations": [
    {
      "category": "diet" | "exercise" | "sleep" | "stress" | "general",
      "title": "string",
      "actions": ["string"],
      "priority": "low" | "medium" | "high"
    }
  ]
}"#;
