//! Shared transcripts for the pipeline test suites.

pub(crate) const KNEE_TRANSCRIPT: &str = "Doctor: How are you feeling?\nPatient: I've had this sharp pain in my knee for two weeks, it's really worrying me.\nDoctor: Let's start ibuprofen.";

pub(crate) const JONES_TRANSCRIPT: &str = "\
Physician: Good morning, Ms. Jones. How are you feeling today?
Patient: Good morning, doctor. I\u{2019}m doing better, but I still have some discomfort now and then.
Physician: I understand you were in a car accident last September. Can you walk me through what happened?
Patient: Yes, it was on September 1st, around 12:30 in the afternoon. I was driving from Cheadle Hulme to Manchester when I had to stop in traffic. Out of nowhere, another car hit me from behind, which pushed my car into the one in front.
Physician: That sounds like a strong impact. Were you wearing your seatbelt?
Patient: Yes, I always do.
Physician: What did you feel immediately after the accident?
Patient: At first, I was just shocked. But then I realized I had hit my head on the steering wheel, and I could feel pain in my neck and back almost right away.
Physician: Did you seek medical attention at that time?
Patient: Yes, I went to Moss Bank Accident and Emergency. They checked me over and said it was a whiplash injury, but they didn\u{2019}t do any X-rays. They just gave me some advice and sent me home.
Physician: How did things progress after that?
Patient: The first four weeks were rough. My neck and back pain were really bad\u{2014}I had trouble sleeping and had to take painkillers regularly. It started improving after that, but I had to go through ten sessions of physiotherapy to help with the stiffness and discomfort.
Physician: That makes sense. Are you still experiencing pain now?
Patient: It\u{2019}s not constant, but I do get occasional backaches. It\u{2019}s nothing like before, though.
Physician: That\u{2019}s good to hear. Have you noticed any other effects, like anxiety while driving or difficulty concentrating?
Patient: No, nothing like that. I don\u{2019}t feel nervous driving, and I haven\u{2019}t had any emotional issues from the accident.
Physician: And how has this impacted your daily life? Work, hobbies, anything like that?
Patient: I had to take a week off work, but after that, I was back to my usual routine. It hasn\u{2019}t really stopped me from doing anything.
Physician: That\u{2019}s encouraging. Let\u{2019}s go ahead and do a physical examination to check your mobility and any lingering pain.
[Physical Examination Conducted]
Physician: Everything looks good. Your neck and back have a full range of movement, and there\u{2019}s no tenderness or signs of lasting damage. Your muscles and spine seem to be in good condition.
Patient: That\u{2019}s a relief!
Physician: Yes, your recovery so far has been quite positive. Given your progress, I\u{2019}d expect you to make a full recovery within six months of the accident. There are no signs of long-term damage or degeneration.
Patient: That\u{2019}s great to hear. So, I don\u{2019}t need to worry about this affecting me in the future?
Physician: That\u{2019}s right. I don\u{2019}t foresee any long-term impact on your work or daily life. If anything changes or you experience worsening symptoms, you can always come back for a follow-up. But at this point, you\u{2019}re on track for a full recovery.
Patient: Thank you, doctor. I appreciate it.
Physician: You\u{2019}re very welcome, Ms. Jones. Take care, and don\u{2019}t hesitate to reach out if you need anything.
";
