//! Prompt text for the two classification round-trips.

use crate::campaign::Intent;

/// Speaker marker for the human side of a transcript.
pub const USER_MARKER: &str = "User: ";

/// System instruction for the intent round-trip.
pub fn intent_system_prompt() -> String {
    let mut prompt = String::with_capacity(2048);
    prompt.push_str(
        "You are responsible for classifying incoming call transcripts into relevant intent types \
         so that the humans assigned to follow up know the best course of action.\n\
         You will be given a call transcript.\n",
    );
    prompt.push_str(&format!(
        "Focus exclusively on the user's replies, i.e. sentences that start with '{USER_MARKER}'.\n"
    ));
    prompt.push_str(
        "Read the transcript carefully and classify it into one of the following categories:\n",
    );
    for intent in Intent::KNOWN {
        prompt.push_str(&format!("- '{}': {}\n", intent.as_str(), definition(&intent)));
    }
    prompt
}

fn definition(intent: &Intent) -> &'static str {
    match intent {
        Intent::Interested => {
            "The user EXPLICITLY indicated they are interested in the course or the university."
        }
        Intent::NotInterested => {
            "The user EXPLICITLY said they are not interested in the course or the university."
        }
        Intent::ImmediateHangup => {
            "The user hangs up without expressing their full intent. This includes cutting off \
             halfway while the caller is talking, or no substantial discussion after exchanging greetings."
        }
        Intent::WrongNumber => "The person who answered indicated that we are calling the wrong number.",
        Intent::NoAction => {
            "The student has already signed up to the course or is in contact with the advisor. \
             Only use this if the student does not need any additional help."
        }
        Intent::WantsCallBack => "The user EXPLICITLY requested a call back.",
        Intent::WantsEmailFollowUp => "The user wished to follow up through email.",
        Intent::WantsWhatsappSmsFollowUp => {
            "The user wished to follow up through instant messaging, such as WhatsApp or SMS."
        }
        Intent::VoiceMail => {
            "The call went to an automated reply or a voice mail. The reply does not come from an actual user."
        }
        Intent::Unknown | Intent::Other(_) => "Anything that does not fit into the above categories.",
    }
}

/// User turn embedding the transcript.
pub fn intent_user_prompt(transcript: &str) -> String {
    format!(
        "Transcript:\n\
         --- BEGIN TRANSCRIPT ---\n\
         {transcript}\n\
         --- END TRANSCRIPT ---\n\n\
         Remember to focus on the User's replies to derive their intent, and not the Agent's!\n\
         Reply in the following JSON format {{\"intent\": <category>}}\n"
    )
}

/// Follow-up asking for the agreed meeting time. `call_time` is local wall-clock.
pub fn interested_datetime_prompt(call_time: &str) -> String {
    format!(
        "NEXT OBJECTIVE:\n\
         Extract the date and time which the user has agreed to meet the enrollment advisor. \
         Output your answer in ISO time format (without time zone) only (e.g. 2006-01-02T15:04:00).\n\
         Extract the time as is, do not do any timezone conversion. If no date and time is given, output 'null'.\n\n\
         CONTEXT:\n\
         The time and date during the conversation is {call_time}.\n\n\
         Reply in the following JSON format {{\"agreedDatetime\": <iso_datetime>}}\n"
    )
}

/// Follow-up asking for the agreed callback time. `call_time` is local wall-clock.
pub fn call_back_datetime_prompt(call_time: &str) -> String {
    format!(
        "NEXT OBJECTIVE:\n\
         Extract the date and time which the user has agreed for the callback.\n\n\
         RULES YOU MUST FOLLOW:\n\
         - Output your answer in ISO time format (without time zone) only (e.g. 2006-01-02T15:04:00).\n\
         - Extract the time as is, DO NOT perform any timezone conversion back to UTC. \
           i.e. If the user mentions 9PM Singapore Time, then just take the time as 9PM.\n\
         - If the user mentions a time without AM or PM, assume it is the time when most people are active. \
           i.e. 5:30 means 5:30PM, 12:30 means 12:30PM.\n\
         - REMEMBER to convert the time to 24-hour format. i.e. 6PM means 18:00, not 6:00.\n\n\
         INSTRUCTIONS:\n\
         Extract the agreed date time for a call back.\n\
         If the user is ambiguous, use the best of your ability to determine the most appropriate agreed \
         date and time that is in line with the intent of this objective.\n\
         If you have to decide an agreed date time, keep within human active hours.\n\
         If there is little hint on when to call back, set it to the next available 6PM (18:00).\n\
         Do not leave empty.\n\n\
         CONTEXT:\n\
         The time and date during the conversation is {call_time}.\n\n\
         Reply in the following JSON format: {{\"agreedDatetime\": <iso_datetime>}}\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_lists_every_intent() {
        let prompt = intent_system_prompt();
        for intent in Intent::KNOWN {
            assert!(prompt.contains(&format!("'{}'", intent.as_str())), "missing {intent}");
        }
        assert!(prompt.contains("'User: '"));
    }

    #[test]
    fn user_prompt_embeds_transcript() {
        let prompt = intent_user_prompt("Agent: Hi\nUser: Not interested");
        assert!(prompt.contains("--- BEGIN TRANSCRIPT ---\nAgent: Hi\nUser: Not interested\n--- END TRANSCRIPT ---"));
        assert!(prompt.contains(r#"{"intent": <category>}"#));
    }

    #[test]
    fn datetime_prompts_embed_call_time() {
        let when = "2024-01-10 18:00:00, Wednesday";
        assert!(interested_datetime_prompt(when).contains(when));
        let call_back = call_back_datetime_prompt(when);
        assert!(call_back.contains(when));
        assert!(call_back.contains("6PM (18:00)"));
        assert!(call_back.contains("5:30 means 5:30PM"));
    }
}
