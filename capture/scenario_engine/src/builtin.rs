//! Scenarios shipped with the engine, one or more per business type.

use crate::scenario::{
    BusinessType, CrmField, Emotion, Intent, Outcome, Scenario, ScenarioCategory, Speaker,
    TranscriptMessage, Urgency,
};

use CrmField::{Appointment, Name, Phone, Service, Urgency as Priority};

use Emotion::{Curious, Frustrated, Happy, Neutral, Relieved, Urgent};
use Speaker::{Agent as Ai, Caller};

type Line = (&'static str, Speaker, Emotion, &'static str);

fn script(lines: &[Line]) -> Vec<TranscriptMessage> {
    lines
        .iter()
        .map(|&(at, speaker, emotion, text)| {
            TranscriptMessage::new(speaker, text).at(at).feeling(emotion)
        })
        .collect()
}

/// Built-in scenarios in display order.
#[must_use]
pub fn scenarios() -> Vec<Scenario> {
    vec![
        plumbing_emergency(),
        plumbing_pricing(),
        dental_new_patient(),
        hvac_emergency(),
        auto_brakes(),
        law_accident(),
        general_after_hours(),
        general_complaint(),
    ]
}

fn plumbing_emergency() -> Scenario {
    Scenario::new(
        "plumbing-emergency",
        "Emergency Pipe Burst",
        BusinessType::Plumbing,
        ScenarioCategory::Emergency,
    )
    .describe(
        "Homeowner with burst pipe flooding basement at 11 PM",
        "Panicked homeowner, water everywhere",
        "1:52",
    )
    .with_transcript(script(&[
        ("0:01", Ai, Neutral, "Thank you for calling Elite Plumbing Services. This is your AI assistant. How can I help you?"),
        ("0:06", Caller, Urgent, "Oh thank god someone answered! I have water shooting everywhere in my basement - a pipe just burst!"),
        ("0:13", Ai, Neutral, "I understand this is urgent. First, can you locate your main water shut-off valve and turn it off? It's usually near your water meter."),
        ("0:21", Caller, Relieved, "Okay, okay... I found it. Turning it now. The water stopped!"),
        ("0:27", Ai, Neutral, "Perfect, you've prevented further damage. Now let me get an emergency plumber to you right away. May I have your name and address?"),
        ("0:35", Caller, Neutral, "I'm David Chen, 847 Maple Drive."),
        ("0:39", Ai, Neutral, "Thank you, David. I have a certified plumber available who can be there within 45 minutes. The emergency service fee is $150 plus parts and labor. Should I dispatch them now?"),
        ("0:51", Caller, Urgent, "Yes, please send them immediately!"),
        ("0:54", Ai, Neutral, "Done. Mike Thompson is on his way. I'm texting you his photo and live ETA."),
        ("1:05", Caller, Relieved, "Thank you so much for answering so late."),
    ]))
    .with_outcome(
        Outcome::new(10, Intent::Emergency, "Emergency Service Dispatched")
            .name("David Chen")
            .service("Burst Pipe Repair")
            .urgency(Urgency::High)
            .appointment("Within 45 minutes"),
    )
    .capture_fields(&[(Priority, 1), (Service, 2), (Name, 5), (Appointment, 6)])
}

fn plumbing_pricing() -> Scenario {
    Scenario::new(
        "plumbing-pricing",
        "Drain Cleaning Quote",
        BusinessType::Plumbing,
        ScenarioCategory::Pricing,
    )
    .describe(
        "Customer asking about drain cleaning costs",
        "Price-conscious customer comparing options",
        "1:24",
    )
    .with_transcript(script(&[
        ("0:01", Ai, Neutral, "Elite Plumbing, how can I help you?"),
        ("0:04", Caller, Curious, "Hi, I was wondering how much you charge for drain cleaning?"),
        ("0:09", Ai, Neutral, "Our drain cleaning starts at $149 for a standard clean. Which drain is giving you trouble?"),
        ("0:16", Caller, Neutral, "It's my kitchen sink. It's been draining really slowly."),
        ("0:21", Ai, Neutral, "Kitchen drains are often caused by grease buildup. The $149 service includes a camera inspection, and the work is guaranteed for 30 days."),
        ("0:35", Caller, Curious, "That's not bad. How soon could you come out?"),
        ("0:39", Ai, Neutral, "We have availability tomorrow afternoon or Thursday morning. Would either of those work?"),
        ("0:46", Caller, Neutral, "Thursday morning would be perfect. Tom Rivera, 2201 Oak Street."),
        ("0:58", Ai, Neutral, "You're all set, Tom. Thursday between 9-11 AM. We'll text you a reminder and the technician's ETA."),
        ("1:07", Caller, Happy, "Great, thanks for the info!"),
    ]))
    .with_outcome(
        Outcome::new(7, Intent::Pricing, "Appointment Scheduled")
            .name("Tom Rivera")
            .service("Drain Cleaning")
            .urgency(Urgency::Low)
            .appointment("Thursday 9-11 AM"),
    )
    .capture_fields(&[(Service, 2), (Priority, 3), (Name, 7), (Appointment, 8)])
}

fn dental_new_patient() -> Scenario {
    Scenario::new(
        "dental-new-patient",
        "New Patient Cleaning",
        BusinessType::Dental,
        ScenarioCategory::Scheduling,
    )
    .describe(
        "New patient scheduling first cleaning and exam",
        "Health-conscious adult establishing dental care",
        "1:32",
    )
    .with_transcript(script(&[
        ("0:01", Ai, Neutral, "Bright Smile Dental, this is your AI assistant. How can I help?"),
        ("0:06", Caller, Curious, "Hi, I just moved to the area and I'm looking for a new dentist. Do you take new patients?"),
        ("0:13", Ai, Neutral, "Welcome to the neighborhood! Yes, we're accepting new patients. What type of appointment are you looking for?"),
        ("0:22", Caller, Neutral, "Just a regular cleaning and checkup."),
        ("0:28", Ai, Neutral, "Our new patient special includes a comprehensive exam, full cleaning, and X-rays for $99."),
        ("0:38", Caller, Happy, "Oh wow, that's a great deal. What times do you have?"),
        ("0:43", Ai, Neutral, "We have openings Monday at 2 PM, Wednesday at 10 AM, or Friday at 4 PM. Any preference?"),
        ("0:51", Caller, Neutral, "Wednesday at 10 works. Michael Torres, 555-234-5678."),
        ("1:05", Ai, Neutral, "You're all set, Michael! I'll text you our new patient forms to fill out ahead of time."),
    ]))
    .with_outcome(
        Outcome::new(8, Intent::Schedule, "New Patient Appointment Booked")
            .name("Michael Torres")
            .phone("555-234-5678")
            .service("New Patient Exam + Cleaning")
            .urgency(Urgency::Low)
            .appointment("Wednesday 10 AM"),
    )
    .capture_fields(&[(Priority, 3), (Service, 4), (Name, 7), (Phone, 7), (Appointment, 8)])
}

fn hvac_emergency() -> Scenario {
    Scenario::new(
        "hvac-emergency",
        "AC Emergency - Heatwave",
        BusinessType::Hvac,
        ScenarioCategory::Emergency,
    )
    .describe(
        "Family without AC during a 95°F heatwave",
        "Desperate parent with young children at home",
        "1:48",
    )
    .with_transcript(script(&[
        ("0:01", Ai, Neutral, "Climate Control HVAC, 24/7 service. How can I help?"),
        ("0:06", Caller, Urgent, "My AC completely stopped working and it's 95 degrees outside. I have two young kids at home."),
        ("0:15", Ai, Neutral, "I completely understand. Let me help you right away. Have you checked the thermostat and the breaker?"),
        ("0:23", Caller, Frustrated, "Thermostat is on and the breaker looks fine. Still nothing."),
        ("0:50", Ai, Neutral, "Sounds like it could be the compressor or capacitor. A technician can be there in about 90 minutes. The emergency service call is $99."),
        ("1:05", Caller, Urgent, "Yes, please send someone. Amanda Foster, 1892 Sunset Boulevard."),
        ("1:18", Ai, Neutral, "Thank you, Amanda. Carlos will be there by 3:30 PM. I'll text you his photo and live tracking."),
        ("1:30", Caller, Relieved, "Thank you so much. You're a lifesaver!"),
    ]))
    .with_outcome(
        Outcome::new(10, Intent::Emergency, "Emergency Tech Dispatched")
            .name("Amanda Foster")
            .service("AC Emergency Repair")
            .urgency(Urgency::High)
            .appointment("Today by 3:30 PM"),
    )
    .capture_fields(&[(Priority, 1), (Service, 4), (Name, 5), (Appointment, 6)])
}

fn auto_brakes() -> Scenario {
    Scenario::new(
        "auto-brakes",
        "Brake Concerns",
        BusinessType::Auto,
        ScenarioCategory::Routine,
    )
    .describe(
        "Driver hearing brake squeaking, concerned about safety",
        "Safety-conscious driver, proactive about maintenance",
        "1:45",
    )
    .with_transcript(script(&[
        ("0:01", Ai, Neutral, "AutoCare Pro, this is your AI assistant. How can I help?"),
        ("0:06", Caller, Curious, "My brakes have been squeaking lately. Should I be worried?"),
        ("0:12", Ai, Neutral, "Is it a high-pitched squeal when you brake, or more of a grinding sound?"),
        ("0:20", Caller, Neutral, "High-pitched, especially first thing in the morning."),
        ("0:26", Ai, Neutral, "That's typically the wear indicators. Our brake inspection is free, and pads run $150-250 per axle."),
        ("0:54", Caller, Neutral, "I drive a 2020 Toyota RAV4. Can I come in tomorrow? Name's Daniel Wright."),
        ("1:00", Ai, Neutral, "Absolutely, Daniel. 11 AM for your RAV4. The inspection takes about 30 minutes."),
        ("1:24", Caller, Happy, "That works. Thanks for the info!"),
    ]))
    .with_outcome(
        Outcome::new(8, Intent::ServiceRequest, "Brake Inspection Scheduled")
            .name("Daniel Wright")
            .service("Brake Inspection - 2020 Toyota RAV4")
            .urgency(Urgency::Medium)
            .appointment("Tomorrow 11 AM"),
    )
    .capture_fields(&[(Priority, 3), (Service, 5), (Name, 5), (Appointment, 6)])
}

fn law_accident() -> Scenario {
    Scenario::new(
        "law-accident",
        "Car Accident Inquiry",
        BusinessType::Law,
        ScenarioCategory::Scheduling,
    )
    .describe(
        "Accident victim seeking legal representation",
        "Injured person, unsure about legal process",
        "2:05",
    )
    .with_transcript(script(&[
        ("0:01", Ai, Neutral, "Thank you for calling Johnson & Associates. How may I assist you?"),
        ("0:06", Caller, Curious, "I was in a car accident last week and I'm not sure if I need a lawyer."),
        ("0:13", Ai, Neutral, "I'm sorry to hear that. Was the accident the other driver's fault?"),
        ("0:21", Caller, Frustrated, "Yes, they ran a red light. My neck and back are still really sore."),
        ("0:39", Ai, Neutral, "Has the other driver's insurance contacted you yet?"),
        ("0:48", Caller, Curious, "They offered me $5,000 to settle. Is that good?"),
        ("0:54", Ai, Neutral, "Early offers are usually much lower than what cases are worth. The consultation is free, and we only get paid if you win."),
        ("1:22", Caller, Neutral, "Okay, I'd like to talk to someone. Marcus Johnson."),
        ("1:26", Ai, Neutral, "Attorney Sarah Chen specializes in auto accidents. I've booked you tomorrow at 2 PM."),
        ("1:54", Caller, Relieved, "Thank you. I feel better about this now."),
    ]))
    .with_outcome(
        Outcome::new(9, Intent::Schedule, "Free Consultation Scheduled")
            .name("Marcus Johnson")
            .service("Personal Injury - Auto Accident")
            .urgency(Urgency::High)
            .appointment("Tomorrow 2 PM"),
    )
    .capture_fields(&[(Service, 1), (Priority, 3), (Name, 7), (Appointment, 8)])
}

fn general_after_hours() -> Scenario {
    Scenario::new(
        "general-after-hours",
        "After Hours Inquiry",
        BusinessType::General,
        ScenarioCategory::AfterHours,
    )
    .describe(
        "2 AM call handled professionally by AI",
        "Customer with urgent question outside business hours",
        "1:35",
    )
    .with_transcript(script(&[
        ("0:01", Ai, Neutral, "Thank you for calling. Our office is currently closed, but I can help you 24/7. How may I assist?"),
        ("0:10", Caller, Urgent, "Oh! I didn't expect anyone to answer. My toilet is overflowing."),
        ("0:18", Ai, Neutral, "Locate the shut-off valve behind the toilet and turn it clockwise to stop the water."),
        ("0:28", Caller, Relieved, "Found it. Okay, it's off now. What's the cost to come out tonight?"),
        ("0:47", Ai, Neutral, "After-hours service is $175 for the first hour. A regular morning call is $95, and with the water off, waiting is an option."),
        ("1:02", Caller, Neutral, "I'll wait until morning then. Brian Taylor, 789 Pine Street."),
        ("1:18", Ai, Neutral, "You're all set, Brian. A technician will be there at 8 AM."),
        ("1:28", Caller, Happy, "I can't believe I got a real answer at 2 AM!"),
    ]))
    .with_outcome(
        Outcome::new(8, Intent::Schedule, "Morning Appointment Scheduled")
            .name("Brian Taylor")
            .service("Toilet Repair")
            .urgency(Urgency::Medium)
            .appointment("Tomorrow 8 AM"),
    )
    .capture_fields(&[(Service, 1), (Priority, 5), (Name, 5), (Appointment, 6)])
}

fn general_complaint() -> Scenario {
    Scenario::new(
        "general-complaint",
        "Complaint Handling",
        BusinessType::General,
        ScenarioCategory::Complaint,
    )
    .describe(
        "Unhappy customer with service issue",
        "Frustrated customer wanting resolution",
        "2:02",
    )
    .with_transcript(script(&[
        ("0:01", Ai, Neutral, "Thank you for calling. How may I help you?"),
        ("0:05", Caller, Frustrated, "A technician came out yesterday and the problem isn't fixed. This is the second time!"),
        ("0:14", Ai, Neutral, "I'm truly sorry, and I understand your frustration. May I have your name?"),
        ("0:24", Caller, Frustrated, "George Miller. I've already paid twice."),
        ("0:51", Ai, Neutral, "Mr. Miller, I'm scheduling our senior technician for tomorrow at no additional charge, parts and labor covered."),
        ("1:25", Caller, Neutral, "Okay... that's actually reasonable. What time?"),
        ("1:30", Ai, Neutral, "I have 9 AM or 1 PM. Our manager will also call you today about a partial refund."),
        ("1:35", Caller, Relieved, "9 AM. And I appreciate you actually listening."),
    ]))
    .with_outcome(
        Outcome::new(6, Intent::Complaint, "Priority Service Scheduled + Manager Callback")
            .name("George Miller")
            .service("Warranty Repair - Priority")
            .urgency(Urgency::High)
            .appointment("Tomorrow 9 AM"),
    )
    .capture_fields(&[(Priority, 1), (Name, 3), (Service, 4), (Appointment, 7)])
}
