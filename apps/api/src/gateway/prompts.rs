// All prompt constants for the assistant gateway.
// Templates use `{placeholder}` markers; handlers fill them with `.replace`
// after the raw user text has been budget-truncated.

/// System prompt for the career assistant, shared by the chat endpoint and
/// the in-app assistant session.
pub const SYSTEM_PROMPT: &str = "You are a helpful career assistant for a job search platform. \
    You help users with job applications, resume advice, interview preparation, \
    and career guidance. Be encouraging, practical, and specific. \
    Keep responses concise and actionable. \
    When job or profile context is provided, tailor your advice to it.";

/// Job analysis prompt template.
/// Replace: {job_description}, {user_skills}, {experience_level}
pub const ANALYZE_JOB_TEMPLATE: &str = r#"Analyze this job posting for a candidate.

JOB DESCRIPTION:
{job_description}

CANDIDATE SKILLS: {user_skills}
EXPERIENCE LEVEL: {experience_level}

Provide:
1. A short summary of the role and its seniority
2. The key qualifications the posting actually requires
3. How well the candidate's skills match, and the biggest gaps
4. Specific suggestions for positioning their application
5. Red flags or notable perks worth weighing"#;

/// Resume feedback prompt template.
/// Replace: {resume_content}, {job_description}, {target_role}
pub const RESUME_FEEDBACK_TEMPLATE: &str = r#"Review this resume against a specific role.

RESUME:
{resume_content}

TARGET ROLE: {target_role}

JOB DESCRIPTION:
{job_description}

Provide:
1. Overall impression and the strongest sections
2. Content that is missing or underweighted for this role
3. Keywords from the job description the resume should include
4. Formatting or clarity issues an ATS or recruiter would trip on
5. The three highest-impact edits to make first"#;

/// Interview preparation prompt template.
/// Replace: {job_description}, {role}, {company}, {user_experience}
pub const INTERVIEW_PREP_TEMPLATE: &str = r#"Prepare a candidate for an upcoming interview.

ROLE: {role} at {company}

JOB DESCRIPTION:
{job_description}

CANDIDATE BACKGROUND: {user_experience}

Provide:
1. Likely interview questions for this role, with brief answer strategies
2. Questions the candidate should ask the interviewer
3. Talking points that connect the candidate's background to the role
4. Company research angles worth mentioning
5. Common pitfalls for this kind of interview"#;
