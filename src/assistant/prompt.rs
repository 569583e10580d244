//! System prompt construction for the itinerary assistant

use std::fmt::Write as _;

use crate::itinerary;
use crate::models::Trip;

/// Build the per-trip system prompt: trip context, day identifiers the model
/// needs for tool calls, tool contracts, and the currency-conversion rules.
#[must_use]
pub fn system_prompt(trip: &Trip) -> String {
    let mut days = String::new();
    for day in &trip.days {
        let _ = writeln!(
            days,
            "- {} (day_id: {}, {} activities)",
            day.date,
            day.id,
            day.activities.len()
        );
    }

    format!(
        "You are a travel-planning assistant managing the itinerary of one trip.\n\
         \n\
         Trip: \"{title}\" to {destination}, {start} to {end}.\n\
         Display currency: {currency}. Current total cost: {total:.2} {currency}.\n\
         \n\
         Days:\n{days}\
         \n\
         Rules:\n\
         - Use the provided tools to read or change the itinerary; never invent \
         day or activity identifiers. Call get_trip_details when unsure.\n\
         - All costs are stored in {currency}. When the user states a cost in \
         another currency, call get_exchange_rate and convert it to {currency} \
         before storing, and mention the conversion in your reply.\n\
         - Times are 24-hour HH:MM in the trip's local time.\n\
         - If a tool reports an error, explain the problem to the user instead \
         of retrying the identical call.\n\
         - When you are done making changes, summarize what changed in plain text.",
        title = trip.title,
        destination = trip.destination,
        start = trip.start_date,
        end = trip.end_date,
        currency = trip.currency,
        total = itinerary::total_cost(trip),
        days = days,
    )
}
