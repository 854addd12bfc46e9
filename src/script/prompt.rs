/// Build the segmentation instruction for the text model
pub fn build_segmentation_prompt(text: &str, style: &str) -> String {
    format!(
        "You are a video script processor. Your task is to:\n\
         \n\
         1. Analyze the input text\n\
         2. Split it into logical scenes (each 5-10 seconds)\n\
         3. For each scene:\n\
         \x20  - Extract the narration text (what will be spoken)\n\
         \x20  - Create a detailed visual prompt for AI image generation\n\
         \x20  - Estimate duration in seconds\n\
         \n\
         Style guidelines: {}\n\
         - Modern, premium tech-focused aesthetic\n\
         - 1920x1080 resolution\n\
         - Clean, professional visuals\n\
         \n\
         Return JSON array with this exact structure:\n\
         [\n\
         \x20 {{\n\
         \x20   \"id\": \"scene-001\",\n\
         \x20   \"text\": \"narration text here\",\n\
         \x20   \"visual_prompt\": \"detailed image generation prompt\",\n\
         \x20   \"duration\": 5.5\n\
         \x20 }}\n\
         ]\n\
         \n\
         Important:\n\
         - Each scene should be 5-10 seconds\n\
         - Visual prompts should be detailed and specific\n\
         - Include mood, lighting, composition in visual prompts\n\
         - Keep narration text concise and clear\n\
         \n\
         Process this text into video scenes:\n\
         \n\
         {}\n\
         \n\
         Generate scenes with narration and visual prompts. Return ONLY valid JSON array, no other text.",
        style, text
    )
}
