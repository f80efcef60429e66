// All LLM prompt constants for the tailoring pipeline.
// Reuses the JSON enforcement suffix from llm_client::prompts.

/// System instruction for résumé tailoring.
pub const SYSTEM_INSTRUCTION: &str = "You are an expert ATS (Applicant Tracking System) resume optimizer and career coach.

Your job is to tailor resumes to match specific job descriptions while maintaining complete authenticity.

CRITICAL RULES:
1. NEVER invent or fabricate experiences, skills, or achievements
2. ONLY enhance and rephrase existing content to match job requirements
3. Incorporate relevant keywords from the job description naturally
4. Maintain all factual information (dates, companies, titles, education)
5. Keep the original structure and organization
6. Return ONLY valid JSON - no markdown, no explanations, no preamble
7. You MAY add at most 1-2 adjacent technologies ONLY if they are strongly implied by the job description and are a reasonable extension of existing skills. Do not add unrelated technologies.";

/// Added when the caller asks to keep the résumé's structure.
pub const PRESERVE_STRUCTURE_DIRECTIVE: &str = "\
Keep every section, company, project and skill category that is present. \
Do not merge, split, rename or drop entries.";

/// Added when the caller allows reorganisation.
pub const FLEXIBLE_STRUCTURE_DIRECTIVE: &str = "\
You may reorder bullets and skill categories by relevance, \
but company and project names must stay exactly as given.";

/// Tailoring prompt template.
/// Replace: {candidate_name}, {target_role}, {structure_directive},
///          {resume_json}, {job_description}
pub const TAILORING_PROMPT_TEMPLATE: &str = r#"TASK: Tailor this resume content for the job description below.

CANDIDATE: {candidate_name}
TARGET ROLE: {target_role}

STRUCTURE: {structure_directive}

JOB DESCRIPTION:
{job_description}

RESUME CONTENT TO ENHANCE:
{resume_json}

INSTRUCTIONS:
1. Summary (MAX 120 words):
   - Rewrite to align with the target role
   - Incorporate key skills and requirements from the job description
   - Keep it impactful and concise

2. Experiences (for each company):
   - Enhance bullet points to include relevant keywords
   - Emphasize achievements matching job requirements
   - KEEP EACH BULLET UNDER 35 WORDS
   - Return in SAME ORDER as input

3. Projects (for each project):
   - Enhance highlights to match technical requirements
   - KEEP EACH HIGHLIGHT UNDER 25 WORDS
   - Return in SAME ORDER as input

4. Skills:
   - Reorder by relevance (most relevant first)
   - Keep the categorized format

CRITICAL RULES:
- Only enhance existing content, never fabricate
- Match companies and projects by their names EXACTLY as given

OUTPUT FORMAT (JSON ONLY):
{
  "summary": "Enhanced summary text",
  "experiences": [
    {"company": "Company Name", "description": ["Enhanced bullet 1", "Enhanced bullet 2"]}
  ],
  "projects": [
    {"name": "Project Name", "highlights": ["Enhanced highlight 1"]}
  ],
  "skills": {"Category Name": ["skill1", "skill2"]},
  "matchedKeywords": ["keyword1"],
  "missingKeywords": ["keyword2"],
  "suggestions": ["suggestion1"],
  "changes": ["change1"]
}"#;

/// Fills `{name}` placeholders in one pass over `template`. Substituted
/// values are never rescanned, and unknown `{...}` text is left as-is.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        let hit = vars.iter().find(|(key, _)| {
            tail.starts_with(key) && tail[key.len()..].starts_with('}')
        });
        match hit {
            Some((key, value)) => {
                out.push_str(value);
                rest = &tail[key.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}
