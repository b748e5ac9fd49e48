//! Region-by-region physique survey.
//!
//! Every body region is rated 0 to 10 from the views where it is visible.
//! Each view is rated several times and the opinions merged, views are merged
//! into one result per region, and the lowest-rated regions are summarised
//! into the assessment handed to the plan stage.

use crate::{
    assessment::VisionAssessment,
    error::TrainerError,
    model::{InferenceModel, ModelRequest, invoke},
    photo::{ImageRole, ImageTriplet, PostureImage},
};

/// Appended to every rating prompt so the model commits to a number.
pub const RATING_INSTRUCTION: &str = "  Where there is insufficient information or the task is \
impossible, always make a best guess number from the information provided.  Please always \
produce a number.";

/// Most opinions one view can take; merged opinions are lettered A to Z.
pub const MAX_OPINIONS: usize = 26;

const REFUSAL_PHRASES: [&str; 3] = ["inappropriate", "not appropriate", "not to judge"];

const BACK: ImageRole = ImageRole::Back;
const FRONT: ImageRole = ImageRole::Front;
const SIDE: ImageRole = ImageRole::Side;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SurveyOptions {
    /// Independent ratings taken per view before they are merged.
    pub opinions: usize,
    /// Extra samples allowed when a rating is unusable.
    pub max_resamples: usize,
    /// How many of the lowest-rated regions the summary keeps.
    pub lagging_areas: usize,
}

impl Default for SurveyOptions {
    fn default() -> Self {
        Self {
            opinions: 3,
            max_resamples: 15,
            lagging_areas: 4,
        }
    }
}

impl SurveyOptions {
    /// Rejects opinion and lagging-area counts the survey cannot honour.
    pub fn validate(&self) -> Result<(), TrainerError> {
        if !(1..=MAX_OPINIONS).contains(&self.opinions) {
            return Err(TrainerError::InvalidInput(format!(
                "opinions must be between 1 and {MAX_OPINIONS}, got {}",
                self.opinions
            )));
        }
        if !(1..=BODY_REGIONS.len()).contains(&self.lagging_areas) {
            return Err(TrainerError::InvalidInput(format!(
                "lagging areas must be between 1 and {}, got {}",
                BODY_REGIONS.len(),
                self.lagging_areas
            )));
        }
        Ok(())
    }
}

/// A body region or quality rated by the survey.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BodyRegion {
    /// Category name used in the lagging-areas summary.
    pub label: &'static str,
    pub article: &'static str,
    /// What is being rated, e.g. "muscle quality number of the calves".
    pub measure: &'static str,
    /// Views the region is rated from, in the order they are merged.
    pub views: &'static [ImageRole],
    /// Replacement measure for the front view, where the full region is not visible.
    pub front_measure: Option<&'static str>,
}

impl BodyRegion {
    const fn muscle(
        label: &'static str,
        measure: &'static str,
        views: &'static [ImageRole],
    ) -> Self {
        Self {
            label,
            article: "the",
            measure,
            views,
            front_measure: None,
        }
    }

    const fn quality(
        label: &'static str,
        article: &'static str,
        measure: &'static str,
        views: &'static [ImageRole],
    ) -> Self {
        Self {
            label,
            article,
            measure,
            views,
            front_measure: None,
        }
    }

    /// The rating prompt for one view.
    pub fn view_prompt(&self, role: ImageRole) -> String {
        let measure = match (role, self.front_measure) {
            (ImageRole::Front, Some(front)) => front,
            _ => self.measure,
        };
        format!(
            "estimate {} {measure} on a scale from 0 to 10 for the person in the photo{RATING_INSTRUCTION}",
            self.article
        )
    }

    /// The prompt that merges the per-view results into one.
    pub fn merge_prompt(&self, views: &[(ImageRole, String)]) -> String {
        let mut prompt = format!(
            "integrate these descriptions to estimate an overall {} on a scale from 0 to 10 for the person.",
            self.measure
        );
        for (role, text) in views {
            prompt.push_str(&format!("\n\n{}:\n\n{text}", role.photo_heading()));
        }
        prompt
    }
}

/// Every region the survey rates, in the order they are reported.
pub const BODY_REGIONS: [BodyRegion; 22] = [
    BodyRegion::quality(
        "cardiovascular conditioning",
        "the",
        "cardiovascular conditioning number",
        &[BACK, FRONT, SIDE],
    ),
    BodyRegion {
        label: "neck",
        article: "the",
        measure: "muscle quality number of the neck and trapezius",
        views: &[BACK, FRONT, SIDE],
        front_measure: Some("muscle quality number of the neck"),
    },
    BodyRegion::muscle("upper chest", "muscle quality number of the upper chest", &[FRONT, SIDE]),
    BodyRegion::muscle("lower chest", "muscle quality number of the lower chest", &[FRONT, SIDE]),
    BodyRegion::muscle(
        "upper abdominals",
        "muscle quality number of the upper abdominals",
        &[FRONT, SIDE],
    ),
    BodyRegion::muscle(
        "lower abdominals",
        "muscle quality number of the lower abdominals",
        &[FRONT, SIDE],
    ),
    BodyRegion::muscle("quadriceps", "muscle quality number of the quadriceps", &[FRONT, SIDE]),
    BodyRegion::muscle("calves", "muscle quality number of the calves", &[BACK, SIDE]),
    BodyRegion::muscle("hamstrings", "muscle quality number of the hamstrings", &[BACK, SIDE]),
    BodyRegion::muscle("latissimus", "muscle quality number of the latissimus", &[BACK, SIDE]),
    BodyRegion::muscle(
        "obliques",
        "muscle quality number of the obliques",
        &[BACK, FRONT, SIDE],
    ),
    BodyRegion::quality("kinetic chain", "the", "kinetic chain number", &[BACK, FRONT, SIDE]),
    BodyRegion::muscle("triceps", "muscle quality number of the triceps", &[BACK, SIDE]),
    BodyRegion::muscle("biceps", "muscle quality number of the biceps", &[FRONT, SIDE]),
    BodyRegion::muscle(
        "front shoulders",
        "muscle quality number of the front shoulders",
        &[FRONT, SIDE],
    ),
    BodyRegion::muscle(
        "rear shoulders",
        "muscle quality number of the rear shoulders",
        &[BACK, SIDE],
    ),
    BodyRegion::quality("posture", "a", "posture quality number", &[BACK, FRONT, SIDE]),
    BodyRegion::muscle("outer chest", "muscle quality number of the outer chest", &[FRONT, SIDE]),
    BodyRegion::quality(
        "upper body versus lower body symmetry",
        "a",
        "quality number for symmetry of upper body versus lower body development",
        &[BACK, FRONT, SIDE],
    ),
    BodyRegion::quality(
        "left versus right body symmetry",
        "a",
        "quality number for symmetry of left-side versus right-side body development",
        &[BACK, FRONT],
    ),
    BodyRegion::muscle("inner chest", "muscle quality number of the inner chest", &[FRONT]),
    BodyRegion::muscle("upper back", "muscle quality number of the upper back", &[BACK]),
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegionRating {
    pub region: &'static str,
    pub summary: String,
}

/// Outcome of a full survey: every region's result and the lagging-areas summary.
#[derive(Clone, Debug)]
pub struct PhysiqueSurvey {
    pub ratings: Vec<RegionRating>,
    pub assessment: VisionAssessment,
}

/// Whether a rating reply has to be sampled again: it refuses or carries no number.
pub fn is_unusable_rating(text: &str) -> bool {
    REFUSAL_PHRASES.iter().any(|phrase| text.contains(phrase))
        || !text.chars().any(|c| c.is_ascii_digit())
}

// Asks for a rating until the reply is usable or the resample budget runs out.
fn sample_rating<M: InferenceModel>(
    model: &mut M,
    image: &PostureImage,
    prompt: &str,
    max_resamples: usize,
) -> Result<String, TrainerError> {
    let ask = |model: &mut M| {
        invoke(
            model,
            ModelRequest::with_images(prompt, vec![image.to_base64()]),
        )
    };

    let mut reply = ask(&mut *model)?;
    let mut resamples = 0;
    while is_unusable_rating(&reply) && resamples < max_resamples {
        log::debug!("Unusable {} rating, sampling again", image.role());
        reply = ask(&mut *model)?;
        resamples += 1;
    }

    if is_unusable_rating(&reply) {
        log::warn!(
            "No usable {} rating after {max_resamples} resamples, keeping the last reply",
            image.role()
        );
    }

    Ok(reply)
}

/// Rates one view several times and merges the opinions into a single answer.
pub fn rate_view<M: InferenceModel>(
    model: &mut M,
    image: &PostureImage,
    prompt: &str,
    options: &SurveyOptions,
) -> Result<String, TrainerError> {
    let opinions = options.opinions.clamp(1, MAX_OPINIONS);
    if opinions != options.opinions {
        log::warn!(
            "Taking {opinions} opinion(s) per view instead of {}",
            options.opinions
        );
    }

    let mut replies = Vec::with_capacity(opinions);
    for _ in 0..opinions {
        replies.push(sample_rating(model, image, prompt, options.max_resamples)?);
    }

    if replies.len() == 1 {
        return Ok(replies.remove(0));
    }

    let mut merge =
        String::from("integrate these descriptions to generate an overall number for the person.");
    for (letter, reply) in ('A'..='Z').zip(&replies) {
        merge.push_str(&format!("\n\nDescription {letter}:\n\n{reply}"));
    }

    invoke(model, ModelRequest::text(merge))
}

/// Rates a region from each of its views and merges the views.
pub fn rate_region<M: InferenceModel>(
    model: &mut M,
    images: &ImageTriplet,
    region: &BodyRegion,
    options: &SurveyOptions,
) -> Result<RegionRating, TrainerError> {
    let mut views = Vec::with_capacity(region.views.len());
    for &role in region.views {
        let prompt = region.view_prompt(role);
        let reply = rate_view(model, images.get(role), &prompt, options)?;
        log::debug!("{} ({role}): {reply}", region.label);
        views.push((role, reply));
    }

    let summary = match views.as_slice() {
        [(_, only)] => only.clone(),
        _ => invoke(model, ModelRequest::text(region.merge_prompt(&views)))?,
    };

    Ok(RegionRating {
        region: region.label,
        summary,
    })
}

/// Prompt asking for the `count` lowest-rated categories among `ratings`.
pub fn lagging_areas_prompt(ratings: &[RegionRating], count: usize) -> String {
    let count = number_word(count);
    let mut prompt = format!(
        "summarize the {count} categories listed below with the lowest numerical ratings.  \
Where there is a tie and multiple categories have a low numerical rating, exercise judgement \
based on the surrounding descriptions to determine which {count} areas need the most work.  \
For each of the {count} lowest-rated areas, include information relevant to creating a \
customized workout to address the lagging area.\n\n"
    );
    for rating in ratings {
        prompt.push_str(&format!("\n\n{} : \n\n{}", rating.region, rating.summary));
    }
    prompt
}

/// Rates every region in [`BODY_REGIONS`] and summarises the lagging ones.
pub fn survey_physique<M: InferenceModel>(
    model: &mut M,
    images: &ImageTriplet,
    options: &SurveyOptions,
) -> Result<PhysiqueSurvey, TrainerError> {
    options.validate()?;

    let mut ratings = Vec::with_capacity(BODY_REGIONS.len());
    for region in &BODY_REGIONS {
        log::info!("Rating {}", region.label);
        ratings.push(rate_region(model, images, region, options)?);
    }

    let prompt = lagging_areas_prompt(&ratings, options.lagging_areas);
    let summary = invoke(model, ModelRequest::text(prompt))?;

    Ok(PhysiqueSurvey {
        ratings,
        assessment: VisionAssessment::new(summary),
    })
}

fn number_word(n: usize) -> String {
    const WORDS: [&str; 11] = [
        "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    ];
    WORDS
        .get(n)
        .map(|word| word.to_string())
        .unwrap_or_else(|| n.to_string())
}
